//! Conversion Dispatcher
//!
//! Validates a conversion request, creates the job record, and launches the
//! matching executor as a detached task. `dispatch` returns the job id as
//! soon as the record exists; nothing awaits the executor. Failures inside
//! the detached task are written to the job store, never propagated, and
//! consumed input files are deleted on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::jobs::JobStore;
use crate::storage::Staging;

use super::executor::{ExecutorError, ExecutorInput, ExecutorRegistry};
use super::types::{ConversionType, ConvertError, ConvertRequest};

/// Progress value written when a job enters `processing`
const PROCESSING_PROGRESS: u8 = 10;

#[derive(Clone)]
pub struct Dispatcher {
    jobs: JobStore,
    registry: Arc<ExecutorRegistry>,
    /// Optional bound on simultaneously running executors; `None` runs
    /// everything admitted immediately
    concurrency: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    pub fn new(jobs: JobStore, registry: Arc<ExecutorRegistry>, max_concurrent_jobs: usize) -> Self {
        let concurrency = if max_concurrent_jobs > 0 {
            Some(Arc::new(Semaphore::new(max_concurrent_jobs)))
        } else {
            None
        };

        Self {
            jobs,
            registry,
            concurrency,
        }
    }

    /// Validate the request, create a job record, and kick off the detached
    /// conversion. Returns the job id without waiting for the executor.
    pub async fn dispatch(&self, request: ConvertRequest) -> Result<Uuid, ConvertError> {
        let conversion_type = request
            .conversion_type
            .as_deref()
            .ok_or(ConvertError::MissingField("conversionType"))?;
        let conversion_type = ConversionType::parse(conversion_type)
            .ok_or_else(|| ConvertError::UnsupportedType(conversion_type.to_string()))?;

        if request.file_id.is_none() {
            return Err(ConvertError::MissingField("fileId"));
        }

        let input = validate_input(conversion_type, &request)?;
        let options = request.options.unwrap_or_default();

        let job_id = Uuid::new_v4();
        self.jobs.create(job_id).await;

        let jobs = self.jobs.clone();
        let registry = Arc::clone(&self.registry);
        let concurrency = self.concurrency.clone();
        tokio::spawn(async move {
            run_job(jobs, registry, concurrency, job_id, conversion_type, input, options).await;
        });

        tracing::info!(
            job_id = %job_id,
            conversion_type = %conversion_type,
            "Conversion job created"
        );

        Ok(job_id)
    }
}

/// Check arity and that every input still exists on disk (uploads race
/// against the staging sweep)
fn validate_input(
    conversion_type: ConversionType,
    request: &ConvertRequest,
) -> Result<ExecutorInput, ConvertError> {
    if conversion_type.is_multi_input() {
        let paths = request.file_paths.as_deref().unwrap_or_default();
        if paths.len() < 2 {
            return Err(ConvertError::TooFewFilesForMerge);
        }

        let mut inputs = Vec::with_capacity(paths.len());
        for path in paths {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConvertError::InputFileNotFound(path.display().to_string()));
            }
            inputs.push(path);
        }
        Ok(ExecutorInput::Many(inputs))
    } else {
        let path = request
            .file_path
            .as_deref()
            .ok_or(ConvertError::MissingField("filePath"))?;
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(ConvertError::InputFileNotFound(path.display().to_string()));
        }
        Ok(ExecutorInput::Single(path))
    }
}

/// The detached conversion task. Every outcome ends as a job store write;
/// input staging files are removed whichever way it goes.
async fn run_job(
    jobs: JobStore,
    registry: Arc<ExecutorRegistry>,
    concurrency: Option<Arc<Semaphore>>,
    job_id: Uuid,
    conversion_type: ConversionType,
    input: ExecutorInput,
    options: Map<String, Value>,
) {
    let _permit = match &concurrency {
        Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
        None => None,
    };

    if let Err(err) = jobs.mark_processing(job_id, PROCESSING_PROGRESS).await {
        tracing::error!(job_id = %job_id, error = %err, "Failed to mark job processing");
        return;
    }
    tracing::debug!(job_id = %job_id, conversion_type = %conversion_type, "Processing conversion");

    match execute(&registry, conversion_type, &input, &options).await {
        Ok((output_path, metadata)) => {
            tracing::info!(
                job_id = %job_id,
                output = %output_path.display(),
                "Conversion job completed"
            );
            if let Err(err) = jobs.complete(job_id, output_path, metadata).await {
                tracing::error!(job_id = %job_id, error = %err, "Failed to record completion");
            }
        }
        Err(err) => {
            tracing::warn!(job_id = %job_id, error = %err, "Conversion job failed");
            if let Some(partial) = &err.partial_output {
                Staging::remove_quiet(partial).await;
            }
            if let Err(store_err) = jobs.fail(job_id, err.message).await {
                tracing::error!(job_id = %job_id, error = %store_err, "Failed to record failure");
            }
        }
    }

    for path in input.paths() {
        Staging::remove_quiet(path).await;
    }
}

async fn execute(
    registry: &ExecutorRegistry,
    conversion_type: ConversionType,
    input: &ExecutorInput,
    options: &Map<String, Value>,
) -> Result<(PathBuf, Option<Map<String, Value>>), ExecutorError> {
    let executor = registry.get(conversion_type).ok_or_else(|| {
        ExecutorError::new(format!("Unsupported conversion type: {conversion_type}"))
    })?;

    let output = executor.execute(input, options).await?;

    // An executor claiming success without an artifact is an infrastructure
    // failure, not a success
    if !output.output_path.exists() {
        return Err(ExecutorError::new("Conversion produced no output file"));
    }

    let mut metadata = output.metadata;
    if conversion_type == ConversionType::CompressPdf {
        if let ExecutorInput::Single(input_path) = input {
            if let Some(compression) = compression_metadata(input_path, &output.output_path).await {
                metadata.get_or_insert_with(Map::new).extend(compression);
            }
        }
    }

    Ok((output.output_path, metadata))
}

/// Original/compressed sizes and the percentage saved, when both files are
/// still present
async fn compression_metadata(input: &Path, output: &Path) -> Option<Map<String, Value>> {
    let original_size = tokio::fs::metadata(input).await.ok()?.len();
    let compressed_size = tokio::fs::metadata(output).await.ok()?.len();
    if original_size == 0 {
        return None;
    }

    let ratio = (1.0 - compressed_size as f64 / original_size as f64) * 100.0;
    let mut metadata = Map::new();
    metadata.insert("originalSize".to_string(), json!(original_size));
    metadata.insert("compressedSize".to_string(), json!(compressed_size));
    metadata.insert("compressionRatio".to_string(), json!(format!("{ratio:.2}")));
    Some(metadata)
}
