//! Client-side types

use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::jobs::JobStatus;

/// Client-side phase, a superset of the server job lifecycle: `Uploading`
/// happens before any job exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Idle,
    Uploading,
    Processing,
    Completed,
    Failed,
}

/// Status payload returned by `GET /api/v1/convert/jobs/:job_id`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Why a status query failed
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("job not found")]
    NotFound,

    #[error("transport error: {0}")]
    Transport(String),
}

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed {
        download_url: Option<String>,
        metadata: Option<Map<String, Value>>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status queries
    pub interval: Duration,
    /// Wall-clock ceiling before the poll gives up locally
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Failures in the client flow before polling takes over
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}
