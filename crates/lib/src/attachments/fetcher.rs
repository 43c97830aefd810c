//! Download one attachment and write it under the attachments directory.

use crate::activity::AttachmentRef;
use crate::attachments::buffer::{is_json_content_type, rehydrate};
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("attachment request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("attachment download returned {0}")]
    Status(reqwest::StatusCode),
    #[error("decoding json attachment: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("writing attachment to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where a successfully fetched attachment was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAttachment {
    pub file_name: String,
    pub local_path: PathBuf,
}

/// Result of fetching one attachment. Failures carry no detail; the cause is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Saved(SavedAttachment),
    Failed,
}

impl FetchOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, FetchOutcome::Saved(_))
    }
}

/// Downloads attachments as raw bytes and persists them as `destination_dir/<declared name>`.
///
/// The declared name is used as-is: no sanitization and no collision handling, so a second
/// attachment with the same name overwrites the first.
#[derive(Clone)]
pub struct AttachmentFetcher {
    client: reqwest::Client,
    destination_dir: PathBuf,
}

impl AttachmentFetcher {
    pub fn new(destination_dir: impl Into<PathBuf>) -> Self {
        Self::with_client(reqwest::Client::new(), destination_dir)
    }

    pub fn with_client(client: reqwest::Client, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            destination_dir: destination_dir.into(),
        }
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    /// Fetch and store one attachment. Never fails: errors are logged and become `Failed`.
    pub async fn fetch(&self, attachment: &AttachmentRef) -> FetchOutcome {
        match self.try_fetch(attachment).await {
            Ok(local_path) => {
                log::info!(
                    "attachment {:?} saved to {}",
                    attachment.name,
                    local_path.display()
                );
                FetchOutcome::Saved(SavedAttachment {
                    file_name: attachment.name.clone(),
                    local_path,
                })
            }
            Err(e) => {
                log::error!("attachment {:?} not saved: {}", attachment.name, e);
                FetchOutcome::Failed
            }
        }
    }

    async fn try_fetch(&self, attachment: &AttachmentRef) -> Result<PathBuf, FetchError> {
        let res = self.client.get(&attachment.content_url).send().await?;
        if !res.status().is_success() {
            return Err(FetchError::Status(res.status()));
        }
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        log::debug!(
            "attachment {:?}: response content-type {:?}, declared {:?}",
            attachment.name,
            content_type,
            attachment.declared_content_type
        );
        // Raw bytes only: text decoding would corrupt binary payloads.
        let body = res.bytes().await?;
        let data = match content_type.as_deref() {
            Some(ct) if is_json_content_type(ct) => rehydrate(&body)?,
            _ => body.to_vec(),
        };

        let local_path = self.destination_dir.join(&attachment.name);
        tokio::fs::write(&local_path, &data)
            .await
            .map_err(|source| FetchError::Write {
                path: local_path.clone(),
                source,
            })?;
        Ok(local_path)
    }
}
