//! Job Store
//!
//! Process-wide registry of conversion jobs, constructed once and injected
//! through application state. Not durable: a restart loses every record, and
//! pollers of a lost id get `JobError::NotFound`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{ConversionJob, JobError, JobStatus, JobUpdate};

/// Keyed registry of conversion jobs
///
/// Cheap to clone; all clones share the same map. Concurrent jobs never
/// contend on the same entry since each job is only written by its own
/// detached task after creation.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<RwLock<HashMap<Uuid, ConversionJob>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize a record in `queued` state with zero progress
    pub async fn create(&self, job_id: Uuid) -> ConversionJob {
        let job = ConversionJob::new(job_id);
        let mut jobs = self.inner.write().await;
        jobs.insert(job_id, job.clone());
        job
    }

    pub async fn get(&self, job_id: Uuid) -> Result<ConversionJob, JobError> {
        let jobs = self.inner.read().await;
        jobs.get(&job_id).cloned().ok_or(JobError::NotFound(job_id))
    }

    /// Apply a partial update, overwriting only the fields it carries
    pub async fn update(&self, job_id: Uuid, update: JobUpdate) -> Result<ConversionJob, JobError> {
        let mut jobs = self.inner.write().await;
        let job = jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(progress) = update.progress {
            job.progress = progress;
        }
        if let Some(output_path) = update.output_path {
            job.output_path = Some(output_path);
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        if let Some(metadata) = update.metadata {
            job.metadata = Some(metadata);
        }

        Ok(job.clone())
    }

    /// Transition to `processing` just before the executor runs
    pub async fn mark_processing(&self, job_id: Uuid, progress: u8) -> Result<(), JobError> {
        self.update(
            job_id,
            JobUpdate {
                status: Some(JobStatus::Processing),
                progress: Some(progress),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Terminal success: record the artifact and any executor metadata
    pub async fn complete(
        &self,
        job_id: Uuid,
        output_path: PathBuf,
        metadata: Option<Map<String, Value>>,
    ) -> Result<(), JobError> {
        self.update(
            job_id,
            JobUpdate {
                status: Some(JobStatus::Completed),
                progress: Some(100),
                output_path: Some(output_path),
                metadata,
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Terminal failure: record the executor's message
    pub async fn fail(&self, job_id: Uuid, error: impl Into<String>) -> Result<(), JobError> {
        self.update(
            job_id,
            JobUpdate {
                status: Some(JobStatus::Failed),
                progress: Some(0),
                error: Some(error.into()),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
