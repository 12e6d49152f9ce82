//! Upload Routes
//!
//! Endpoints:
//! - POST /api/v1/upload - Stage a single file for conversion
//! - POST /api/v1/upload/batch - Stage several files (merge inputs)

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;
use crate::upload::{self, IncomingFile, UploadError, UploadedFile};
use crate::usage::Identity;

// ============================================================================
// Error Response
// ============================================================================

impl IntoResponse for UploadError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = match &self {
            UploadError::MissingFile => "NO_FILE",
            UploadError::IpThrottled { .. } => "IP_RATE_LIMITED",
            UploadError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            UploadError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            UploadError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            UploadError::TooManyFiles { .. } => "TOO_MANY_FILES",
            UploadError::Multipart(_) => "INVALID_MULTIPART",
            UploadError::Io(_) => "STORAGE_ERROR",
        };

        let mut body = json!({
            "error": self.to_string(),
            "code": code,
        });

        // Rate-limit rejections carry retry data for the client
        match &self {
            UploadError::IpThrottled { limit, reset } => {
                body["limit"] = json!(limit);
                body["resetAt"] = json!(reset.to_rfc3339());
            }
            UploadError::QuotaExceeded {
                limit,
                remaining,
                reset,
                tier,
                ..
            } => {
                body["limit"] = json!(limit);
                body["remaining"] = json!(remaining);
                body["resetAt"] = json!(reset.to_rfc3339());
                body["tier"] = json!(tier);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
pub(crate) struct UploadResponse {
    success: bool,
    #[serde(flatten)]
    file: UploadedFile,
}

#[derive(Serialize)]
pub(crate) struct BatchUploadResponse {
    success: bool,
    files: Vec<UploadedFile>,
}

/// POST /api/v1/upload
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadError> {
    let identity = Identity::from_headers(&headers);
    let file = next_file(&mut multipart).await?.ok_or(UploadError::MissingFile)?;

    let stored = upload::store_upload(
        state.staging(),
        state.limiter(),
        &state.config().limits,
        &identity,
        file,
    )
    .await?;

    Ok(Json(UploadResponse {
        success: true,
        file: stored,
    }))
}

/// POST /api/v1/upload/batch
pub async fn upload_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<BatchUploadResponse>, UploadError> {
    let identity = Identity::from_headers(&headers);

    let mut files = Vec::new();
    while let Some(file) = next_file(&mut multipart).await? {
        files.push(file);
    }
    if files.is_empty() {
        return Err(UploadError::MissingFile);
    }

    let stored = upload::store_batch(
        state.staging(),
        state.limiter(),
        &state.config().limits,
        &identity,
        files,
    )
    .await?;

    Ok(Json(BatchUploadResponse {
        success: true,
        files: stored,
    }))
}

/// Pull the next file-bearing field off the multipart stream
async fn next_file(multipart: &mut Multipart) -> Result<Option<IncomingFile>, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let is_file_field = field.file_name().is_some() || field.name() == Some("file");
        if !is_file_field {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.bin").to_string();
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .to_string()
            });
        let bytes = field
            .bytes()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?;

        return Ok(Some(IncomingFile {
            file_name,
            mime_type,
            bytes,
        }));
    }

    Ok(None)
}
