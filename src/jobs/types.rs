//! Job record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle state of a conversion job
///
/// Jobs move `Queued -> Processing -> Completed | Failed` and never leave a
/// terminal state. The client side additionally models an `uploading` phase
/// that precedes job creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A tracked conversion job
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    pub job_id: Uuid,

    pub status: JobStatus,

    /// Cosmetic 0-100 progress indicator, not authoritative
    pub progress: u8,

    /// Result artifact, set only when completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Failure message, set only when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Executor-attached extras (e.g. compression ratio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    pub created_at: DateTime<Utc>,
}

impl ConversionJob {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            progress: 0,
            output_path: None,
            error: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }
}

/// Partial update applied to a job record; `None` fields are left untouched
#[derive(Debug, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid job id: {0}")]
    InvalidId(String),
}
