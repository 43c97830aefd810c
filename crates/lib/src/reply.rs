//! Reply sink: where a turn's replies go.
//!
//! Handlers take the sink explicitly so concurrently processed items can all reply
//! through the same channel without any implicit per-call context.

use crate::activity::ReplyPayload;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Destination for the replies of one turn (transport connection, HTTP response, test recorder).
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Deliver one reply. Errors are transport failures, not user-facing.
    async fn send(&self, reply: ReplyPayload) -> Result<(), String>;
}

/// Sink that buffers replies in emission order; used by the gateway to answer a turn in one response.
#[derive(Default)]
pub struct CollectingSink {
    replies: Mutex<Vec<ReplyPayload>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_replies(self) -> Vec<ReplyPayload> {
        self.replies.into_inner()
    }
}

#[async_trait]
impl ReplySink for CollectingSink {
    async fn send(&self, reply: ReplyPayload) -> Result<(), String> {
        self.replies.lock().await.push(reply);
        Ok(())
    }
}
