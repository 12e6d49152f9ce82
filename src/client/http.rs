//! HTTP client for the conversion API
//!
//! `HttpStatusSource` backs the poller with real status queries;
//! `ConvertClient` drives the whole flow the way the web client does:
//! upload, dispatch, then poll.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::poller::{JobPoller, StatusSource};
use super::types::{
    ClientError, JobPhase, JobStatusResponse, PollConfig, PollError, PollOutcome,
};

/// Status queries against `GET {base_url}/api/v1/convert/jobs/:job_id`
#[derive(Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self, job_id: Uuid) -> Result<JobStatusResponse, PollError> {
        let url = format!("{}/api/v1/convert/jobs/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PollError::NotFound);
        }

        response
            .error_for_status()
            .map_err(|e| PollError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFileWire {
    file_id: Uuid,
    file_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUploadWire {
    files: Vec<UploadedFileWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DispatchWire {
    job_id: Uuid,
}

/// Drives upload -> dispatch -> poll against a Docmill server
pub struct ConvertClient {
    client: reqwest::Client,
    base_url: String,
    poll_config: PollConfig,
}

impl ConvertClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            poll_config: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll_config: PollConfig) -> Self {
        self.poll_config = poll_config;
        self
    }

    /// Convert a single local file, reporting `(phase, progress)` along the
    /// way
    pub async fn convert_file(
        &self,
        path: &Path,
        conversion_type: &str,
        options: Map<String, Value>,
        mut on_progress: impl FnMut(JobPhase, u8) + Send,
    ) -> Result<PollOutcome, ClientError> {
        on_progress(JobPhase::Uploading, 20);
        let uploaded = self.upload(path, "/api/v1/upload").await?;

        on_progress(JobPhase::Processing, 50);
        let job_id = self
            .dispatch(json!({
                "fileId": uploaded.file_id,
                "filePath": uploaded.file_path,
                "conversionType": conversion_type,
                "options": options,
            }))
            .await?;

        Ok(self.poll(job_id, on_progress).await)
    }

    /// Convert several local files through a multi-file conversion (merge)
    pub async fn convert_files(
        &self,
        paths: &[&Path],
        conversion_type: &str,
        options: Map<String, Value>,
        mut on_progress: impl FnMut(JobPhase, u8) + Send,
    ) -> Result<PollOutcome, ClientError> {
        on_progress(JobPhase::Uploading, 10);

        let mut form = reqwest::multipart::Form::new();
        for path in paths {
            form = form.part("file", file_part(path).await?);
        }
        let batch: BatchUploadWire = self
            .post_multipart("/api/v1/upload/batch", form)
            .await?;

        on_progress(JobPhase::Processing, 50);
        let file_paths: Vec<&str> = batch.files.iter().map(|f| f.file_path.as_str()).collect();
        let file_id = batch.files.first().map(|f| f.file_id).unwrap_or_default();
        let job_id = self
            .dispatch(json!({
                "fileId": file_id,
                "filePaths": file_paths,
                "conversionType": conversion_type,
                "options": options,
            }))
            .await?;

        Ok(self.poll(job_id, on_progress).await)
    }

    async fn upload(&self, path: &Path, endpoint: &str) -> Result<UploadedFileWire, ClientError> {
        let form = reqwest::multipart::Form::new().part("file", file_part(path).await?);
        self.post_multipart(endpoint, form).await
    }

    async fn post_multipart<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.post(&url).multipart(form).send().await?;
        Self::parse(response).await
    }

    async fn dispatch(&self, body: Value) -> Result<Uuid, ClientError> {
        let url = format!("{}/api/v1/convert", self.base_url);
        let response = self.client.post(&url).json(&body).send().await?;
        let dispatched: DispatchWire = Self::parse(response).await?;
        Ok(dispatched.job_id)
    }

    async fn poll(
        &self,
        job_id: Uuid,
        on_progress: impl FnMut(JobPhase, u8) + Send,
    ) -> PollOutcome {
        let source = HttpStatusSource::new(self.client.clone(), self.base_url.clone());
        JobPoller::with_config(source, self.poll_config.clone())
            .poll(job_id, on_progress)
            .await
    }

    /// Surface the server's specific error message on non-success statuses
    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<Value>().await {
                Ok(body) => body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("request failed")
                    .to_string(),
                Err(_) => "request failed".to_string(),
            };
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

async fn file_part(path: &Path) -> Result<reqwest::multipart::Part, ClientError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string());
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime.as_ref())?;
    Ok(part)
}
