//! Inbound attachment handling: download each attachment, decode it, write it to disk,
//! and acknowledge every item individually.

mod buffer;
mod fetcher;
mod ingest;

pub use buffer::{is_json_content_type, rehydrate};
pub use fetcher::{AttachmentFetcher, FetchError, FetchOutcome, SavedAttachment};
pub use ingest::{reply_for, AttachmentIngestor, NOT_SAVED_TEXT};
