//! Upload handling
//!
//! Validates incoming files against the caller's tier and quota, stages them
//! to disk, and hands back opaque file handles the dispatcher consumes.

mod service;
mod types;

pub use service::{store_batch, store_upload, IncomingFile};
pub use types::{UploadError, UploadedFile, ALLOWED_MIME_TYPES, MERGE_MIME_TYPES};
