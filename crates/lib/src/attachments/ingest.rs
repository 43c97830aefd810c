//! Ingest every attachment on a turn concurrently and acknowledge each one in input order.

use crate::activity::{AttachmentRef, ReplyPayload};
use crate::attachments::fetcher::{AttachmentFetcher, FetchOutcome};
use crate::reply::ReplySink;
use futures_util::future::join_all;

/// Reply text for an attachment that could not be stored.
pub const NOT_SAVED_TEXT: &str = "Attachment was not successfully saved to disk.";

#[derive(Clone)]
pub struct AttachmentIngestor {
    fetcher: AttachmentFetcher,
}

impl AttachmentIngestor {
    pub fn new(fetcher: AttachmentFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &AttachmentFetcher {
        &self.fetcher
    }

    /// Fetch all attachments concurrently on the current task. The outcomes line up with
    /// `attachments` one to one, whatever order the downloads finish in.
    pub async fn ingest(&self, attachments: &[AttachmentRef]) -> Vec<FetchOutcome> {
        join_all(attachments.iter().map(|a| self.fetcher.fetch(a))).await
    }

    /// Ingest, then send one reply per attachment. Nothing is sent until every fetch has finished.
    pub async fn ingest_and_reply(
        &self,
        attachments: &[AttachmentRef],
        sink: &dyn ReplySink,
    ) -> Result<(), String> {
        let outcomes = self.ingest(attachments).await;
        let saved = outcomes.iter().filter(|o| o.is_saved()).count();
        log::debug!("ingested {} attachment(s), {} saved", outcomes.len(), saved);
        for outcome in &outcomes {
            sink.send(reply_for(outcome)).await?;
        }
        Ok(())
    }
}

/// Acknowledgement for one fetch outcome.
pub fn reply_for(outcome: &FetchOutcome) -> ReplyPayload {
    match outcome {
        FetchOutcome::Saved(saved) => ReplyPayload::text(format!(
            "Attachment \"{}\" has been received and saved to \"{}\".",
            saved.file_name,
            saved.local_path.display()
        )),
        FetchOutcome::Failed => ReplyPayload::text(NOT_SAVED_TEXT),
    }
}
