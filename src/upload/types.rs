//! Upload types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::usage::UserTier;

// ============================================================================
// Constants
// ============================================================================

/// Accepted types for single-file conversions
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "image/jpeg",
    "image/png",
    "image/webp",
    "text/plain",
];

/// Batch uploads feed the merge pipeline, which is PDF-only
pub const MERGE_MIME_TYPES: &[&str] = &["application/pdf"];

// ============================================================================
// Handle
// ============================================================================

/// Handle to a staged upload
///
/// The staged file belongs to the pipeline until a conversion executor
/// consumes it; the dispatcher deletes it afterwards on both success and
/// failure paths.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_id: Uuid,
    pub file_name: String,
    pub file_size: u64,
    pub file_path: PathBuf,
    pub mime_type: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file provided")]
    MissingFile,

    #[error("Too many requests from this IP address. Please try again later.")]
    IpThrottled {
        limit: u32,
        reset: DateTime<Utc>,
    },

    #[error("{message}")]
    QuotaExceeded {
        message: String,
        limit: u32,
        remaining: u32,
        reset: DateTime<Utc>,
        tier: UserTier,
    },

    #[error("File too large. Maximum size is {}MB.", max / (1024 * 1024))]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Too many files: {count} (max: {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("Invalid multipart payload: {0}")]
    Multipart(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::MissingFile => StatusCode::BAD_REQUEST,
            Self::IpThrottled { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::TooManyFiles { .. } => StatusCode::BAD_REQUEST,
            Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
