//! Download Route
//!
//! GET /api/v1/download/:job_id?filename= - Fetch the result artifact of a
//! completed job as an attachment.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::jobs::{JobError, JobStatus};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Job not found")]
    JobNotFound,

    #[error("Invalid job id: {0}")]
    InvalidId(String),

    #[error("File not ready")]
    NotReady,

    #[error("Output file not found")]
    OutputMissing,

    #[error("Download failed: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let (status, code) = match &self {
            DownloadError::JobNotFound => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND"),
            DownloadError::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_JOB_ID"),
            DownloadError::NotReady => (StatusCode::BAD_REQUEST, "NOT_READY"),
            DownloadError::OutputMissing => (StatusCode::NOT_FOUND, "OUTPUT_MISSING"),
            DownloadError::Io(err) => {
                tracing::error!(error = %err, "Download failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "DOWNLOAD_FAILED")
            }
        };
        let body = Json(json!({ "error": self.to_string(), "code": code }));
        (status, body).into_response()
    }
}

impl From<JobError> for DownloadError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(_) => DownloadError::JobNotFound,
            JobError::InvalidId(id) => DownloadError::InvalidId(id),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:job_id", get(download))
}

#[derive(Deserialize)]
struct DownloadQuery {
    filename: Option<String>,
}

/// GET /api/v1/download/:job_id
async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, DownloadError> {
    let job_id = Uuid::parse_str(&job_id).map_err(|_| DownloadError::InvalidId(job_id))?;
    let job = state.jobs().get(job_id).await?;

    if job.status != JobStatus::Completed {
        return Err(DownloadError::NotReady);
    }
    let output_path = job.output_path.ok_or(DownloadError::NotReady)?;

    let bytes = match tokio::fs::read(&output_path).await {
        Ok(bytes) => bytes,
        // Completed but already swept: the artifact is gone for good
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(DownloadError::OutputMissing)
        }
        Err(err) => return Err(DownloadError::Io(err)),
    };

    let content_type = mime_guess::from_path(&output_path)
        .first_or_octet_stream()
        .to_string();
    let download_name = query.filename.unwrap_or_else(|| {
        output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "converted-file".to_string())
    });

    tracing::debug!(
        job_id = %job_id,
        file = %output_path.display(),
        size = bytes.len(),
        "Serving download"
    );

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{download_name}\""),
        ),
    ];
    Ok((headers, bytes))
}
