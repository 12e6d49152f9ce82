//! Router-level tests for the conversion pipeline: dispatch, status polling,
//! and download against a live router with a fake executor registered.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Map, Value};

use docmill_server::config::Config;
use docmill_server::convert::{
    ConversionExecutor, ConversionType, ExecutorError, ExecutorInput, ExecutorOutput,
    ExecutorRegistry,
};
use docmill_server::routes;
use docmill_server::state::AppState;
use docmill_server::usage::InMemoryUsageLimiter;

/// Copies its input to a sibling `.out` file after an optional delay
struct CopyExecutor {
    delay: Duration,
}

#[async_trait]
impl ConversionExecutor for CopyExecutor {
    async fn execute(
        &self,
        input: &ExecutorInput,
        _options: &Map<String, Value>,
    ) -> Result<ExecutorOutput, ExecutorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let ExecutorInput::Single(path) = input else {
            return Err(ExecutorError::new("expected a single input"));
        };
        let output = path.with_extension("out");
        tokio::fs::copy(path, &output).await?;
        Ok(ExecutorOutput::from(output))
    }
}

fn server_with(delay: Duration, staging_root: &Path) -> TestServer {
    let mut config = Config::default();
    config.staging.upload_dir = staging_root.join("uploads");
    config.staging.output_dir = staging_root.join("outputs");

    let mut registry = ExecutorRegistry::new();
    registry.register(ConversionType::CompressPdf, Arc::new(CopyExecutor { delay }));

    let limiter = Arc::new(InMemoryUsageLimiter::new(config.limits.clone()));
    let state = AppState::new(config, registry, limiter);

    TestServer::new(routes::app(state)).expect("failed to start test server")
}

async fn write_input(dir: &Path, name: &str, contents: &[u8]) -> String {
    let path = dir.join(name);
    tokio::fs::write(&path, contents).await.unwrap();
    path.display().to_string()
}

async fn poll_until_terminal(server: &TestServer, job_id: &str) -> Value {
    for _ in 0..200 {
        let response = server
            .get(&format!("/api/v1/convert/jobs/{job_id}"))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: Value = response.json();
        let status = body["status"].as_str().unwrap().to_string();
        if status == "completed" || status == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never settled");
}

#[tokio::test]
async fn test_dispatch_poll_download_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let server = server_with(Duration::ZERO, tmp.path());
    let input_path = write_input(tmp.path(), "report.pdf", b"%PDF-round-trip").await;

    let response = server
        .post("/api/v1/convert")
        .json(&json!({
            "fileId": "file-1",
            "filePath": input_path,
            "conversionType": "compress-pdf",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["status"], json!("queued"));
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let settled = poll_until_terminal(&server, &job_id).await;
    assert_eq!(settled["status"], json!("completed"));
    assert_eq!(settled["progress"], json!(100));

    let download_url = settled["downloadUrl"].as_str().unwrap();
    assert!(download_url.starts_with(&format!("/api/v1/download/{job_id}")));

    let download = server.get(download_url).await;
    assert_eq!(download.status_code(), StatusCode::OK);
    assert_eq!(download.as_bytes().as_ref(), &b"%PDF-round-trip"[..]);
}

#[tokio::test]
async fn test_merge_with_one_file_is_rejected_before_any_job() {
    let tmp = tempfile::tempdir().unwrap();
    let server = server_with(Duration::ZERO, tmp.path());
    let input_path = write_input(tmp.path(), "only.pdf", b"%PDF-").await;

    let response = server
        .post("/api/v1/convert")
        .json(&json!({
            "fileId": "file-1",
            "conversionType": "merge-pdf",
            "filePaths": [input_path],
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], json!("TOO_FEW_FILES"));
    assert!(body["error"].as_str().unwrap().contains("At least two"));
}

#[tokio::test]
async fn test_unsupported_conversion_type() {
    let tmp = tempfile::tempdir().unwrap();
    let server = server_with(Duration::ZERO, tmp.path());
    let input_path = write_input(tmp.path(), "doc.pdf", b"%PDF-").await;

    let response = server
        .post("/api/v1/convert")
        .json(&json!({
            "fileId": "file-1",
            "filePath": input_path,
            "conversionType": "pdf-to-csv",
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], json!("UNSUPPORTED_CONVERSION_TYPE"));
}

#[tokio::test]
async fn test_missing_input_file_is_404() {
    let tmp = tempfile::tempdir().unwrap();
    let server = server_with(Duration::ZERO, tmp.path());

    let response = server
        .post("/api/v1/convert")
        .json(&json!({
            "fileId": "file-1",
            "filePath": tmp.path().join("never-uploaded.pdf").display().to_string(),
            "conversionType": "compress-pdf",
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], json!("INPUT_FILE_NOT_FOUND"));
}

#[tokio::test]
async fn test_polling_unknown_job_is_404() {
    let tmp = tempfile::tempdir().unwrap();
    let server = server_with(Duration::ZERO, tmp.path());

    let response = server
        .get("/api/v1/convert/jobs/00000000-0000-0000-0000-000000000000")
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], json!("JOB_NOT_FOUND"));
}

#[tokio::test]
async fn test_download_before_completion_is_not_ready() {
    let tmp = tempfile::tempdir().unwrap();
    let server = server_with(Duration::from_millis(500), tmp.path());
    let input_path = write_input(tmp.path(), "slow.pdf", b"%PDF-").await;

    let response = server
        .post("/api/v1/convert")
        .json(&json!({
            "fileId": "file-1",
            "filePath": input_path,
            "conversionType": "compress-pdf",
        }))
        .await;
    let body: Value = response.json();
    let job_id = body["jobId"].as_str().unwrap();

    // The executor is still sleeping; the artifact cannot be ready yet
    let download = server.get(&format!("/api/v1/download/{job_id}")).await;
    assert_eq!(download.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = download.json();
    assert_eq!(body["code"], json!("NOT_READY"));
}

#[tokio::test]
async fn test_download_after_sweep_is_output_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let server = server_with(Duration::ZERO, tmp.path());
    let input_path = write_input(tmp.path(), "doc.pdf", b"%PDF-").await;

    let response = server
        .post("/api/v1/convert")
        .json(&json!({
            "fileId": "file-1",
            "filePath": input_path,
            "conversionType": "compress-pdf",
        }))
        .await;
    let body: Value = response.json();
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let settled = poll_until_terminal(&server, &job_id).await;
    assert_eq!(settled["status"], json!("completed"));

    // Simulate the expiry sweep claiming the artifact
    let download_url = settled["downloadUrl"].as_str().unwrap().to_string();
    let status: Value = server
        .get(&format!("/api/v1/convert/jobs/{job_id}"))
        .await
        .json();
    assert_eq!(status["status"], json!("completed"));
    let output = tmp.path().join("doc.out");
    tokio::fs::remove_file(&output).await.unwrap();

    let download = server.get(&download_url).await;
    assert_eq!(download.status_code(), StatusCode::NOT_FOUND);
    let body: Value = download.json();
    assert_eq!(body["code"], json!("OUTPUT_MISSING"));
}

#[tokio::test]
async fn test_executor_failure_surfaces_in_status() {
    struct FailingExecutor;

    #[async_trait]
    impl ConversionExecutor for FailingExecutor {
        async fn execute(
            &self,
            _input: &ExecutorInput,
            _options: &Map<String, Value>,
        ) -> Result<ExecutorOutput, ExecutorError> {
            Err(ExecutorError::new("disk full"))
        }
    }

    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.staging.upload_dir = tmp.path().join("uploads");
    config.staging.output_dir = tmp.path().join("outputs");

    let mut registry = ExecutorRegistry::new();
    registry.register(ConversionType::CompressPdf, Arc::new(FailingExecutor));
    let limiter = Arc::new(InMemoryUsageLimiter::new(config.limits.clone()));
    let server = TestServer::new(routes::app(AppState::new(config, registry, limiter))).unwrap();

    let input_path = write_input(tmp.path(), "doc.pdf", b"%PDF-").await;
    let response = server
        .post("/api/v1/convert")
        .json(&json!({
            "fileId": "file-1",
            "filePath": input_path,
            "conversionType": "compress-pdf",
        }))
        .await;
    let body: Value = response.json();
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let settled = poll_until_terminal(&server, &job_id).await;
    assert_eq!(settled["status"], json!("failed"));
    assert_eq!(settled["error"], json!("disk full"));
    assert!(settled.get("downloadUrl").is_none());
}

#[tokio::test]
async fn test_usage_endpoint_reports_quota() {
    let tmp = tempfile::tempdir().unwrap();
    let server = server_with(Duration::ZERO, tmp.path());
    let input_path = write_input(tmp.path(), "doc.pdf", b"%PDF-usage").await;

    let before: Value = server.get("/api/v1/usage").await.json();
    assert_eq!(before["conversionsUsed"], json!(0));
    assert_eq!(before["tier"], json!("ANONYMOUS"));

    let response = server
        .post("/api/v1/convert")
        .json(&json!({
            "fileId": "file-1",
            "filePath": input_path,
            "conversionType": "compress-pdf",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let after: Value = server.get("/api/v1/usage").await.json();
    assert_eq!(after["conversionsUsed"], json!(1));
    assert_eq!(
        after["conversionsRemaining"].as_u64().unwrap(),
        after["dailyLimit"].as_u64().unwrap() - 1
    );
}
