//! Conversion Routes
//!
//! Endpoints:
//! - POST /api/v1/convert - Create a conversion job (returns immediately)
//! - GET /api/v1/convert/jobs/:job_id - Poll job status

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::convert::{ConvertError, ConvertRequest};
use crate::jobs::{JobError, JobStatus};
use crate::state::AppState;
use crate::usage::Identity;

impl IntoResponse for ConvertError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = match &self {
            ConvertError::MissingField(_) => "MISSING_FIELD",
            ConvertError::UnsupportedType(_) => "UNSUPPORTED_CONVERSION_TYPE",
            ConvertError::InputFileNotFound(_) => "INPUT_FILE_NOT_FOUND",
            ConvertError::TooFewFilesForMerge => "TOO_FEW_FILES",
            ConvertError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
        };

        let mut body = json!({ "error": self.to_string(), "code": code });
        if let ConvertError::QuotaExceeded {
            limit,
            remaining,
            reset,
            ..
        } = &self
        {
            body["limit"] = json!(limit);
            body["remaining"] = json!(remaining);
            body["resetAt"] = json!(reset.to_rfc3339());
        }

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for JobError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let (status, code) = match &self {
            JobError::NotFound(_) => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND"),
            JobError::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_JOB_ID"),
        };
        let body = Json(json!({ "error": self.to_string(), "code": code }));
        (status, body).into_response()
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(dispatch))
        .route("/jobs/:job_id", get(job_status))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DispatchResponse {
    success: bool,
    job_id: Uuid,
    status: JobStatus,
    message: &'static str,
}

/// POST /api/v1/convert
///
/// Validates the request, creates the job, and returns without waiting for
/// the conversion to run.
async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<DispatchResponse>, ConvertError> {
    let identity = Identity::from_headers(&headers);

    let usage = state.limiter().check_usage(&identity).await;
    if !usage.allowed {
        return Err(ConvertError::QuotaExceeded {
            message: usage
                .message
                .unwrap_or_else(|| "Daily conversion limit reached".to_string()),
            limit: usage.usage.daily_limit,
            remaining: usage.usage.conversions_remaining,
            reset: usage.usage.reset_date,
        });
    }

    // Input sizes have to be read before dispatch: the detached task deletes
    // the staged files when it finishes
    let bytes_processed = input_bytes(&request).await;

    let job_id = state.dispatcher().dispatch(request).await?;

    state
        .limiter()
        .record_conversion(&identity, bytes_processed)
        .await;

    Ok(Json(DispatchResponse {
        success: true,
        job_id,
        status: JobStatus::Queued,
        message: "Conversion job created",
    }))
}

async fn input_bytes(request: &ConvertRequest) -> u64 {
    let mut total = 0u64;
    if let Some(path) = &request.file_path {
        if let Ok(metadata) = tokio::fs::metadata(path).await {
            total += metadata.len();
        }
    }
    if let Some(paths) = &request.file_paths {
        for path in paths {
            if let Ok(metadata) = tokio::fs::metadata(path).await {
                total += metadata.len();
            }
        }
    }
    total
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusBody {
    job_id: Uuid,
    status: JobStatus,
    progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// GET /api/v1/convert/jobs/:job_id
async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusBody>, JobError> {
    let job_id = Uuid::parse_str(&job_id).map_err(|_| JobError::InvalidId(job_id))?;
    let job = state.jobs().get(job_id).await?;

    let download_url = match (&job.status, &job.output_path) {
        (JobStatus::Completed, Some(output_path)) => {
            let filename = output_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Some(format!(
                "/api/v1/download/{}?filename={}",
                job.job_id,
                urlencoding::encode(&filename)
            ))
        }
        _ => None,
    };

    Ok(Json(JobStatusBody {
        job_id: job.job_id,
        status: job.status,
        progress: job.progress,
        metadata: job.metadata,
        download_url,
        error: job.error,
    }))
}
