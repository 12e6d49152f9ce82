//! Job Poller
//!
//! Queries job status on a fixed interval until the job settles or a local
//! wall-clock ceiling passes. The ceiling guards against jobs that will
//! never resolve (a restarted server that lost the job, a hung executor);
//! hitting it fails the poll locally without touching server state.

use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use crate::jobs::JobStatus;

use super::types::{JobPhase, JobStatusResponse, PollConfig, PollError, PollOutcome};

/// Local progress never reaches 100 while the job is still running
const PROGRESS_CAP: u8 = 95;
/// Per-tick nudge applied on top of the server's cosmetic progress
const PROGRESS_NUDGE: u8 = 5;

const TIMEOUT_MESSAGE: &str = "Conversion timed out. Please try again.";
const STATUS_CHECK_FAILED: &str = "Failed to check conversion status";

/// Where job status comes from; lets tests poll without a server
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: Uuid) -> Result<JobStatusResponse, PollError>;
}

pub struct JobPoller<S> {
    source: S,
    config: PollConfig,
}

impl<S: StatusSource> JobPoller<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, PollConfig::default())
    }

    pub fn with_config(source: S, config: PollConfig) -> Self {
        Self { source, config }
    }

    /// Poll until the job settles, reporting `(phase, progress)` after each
    /// query. Abandoning the returned future stops the polling; the
    /// server-side job continues regardless.
    pub async fn poll(
        &self,
        job_id: Uuid,
        mut on_progress: impl FnMut(JobPhase, u8) + Send,
    ) -> PollOutcome {
        let started = Instant::now();
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut progress: u8 = 0;

        loop {
            interval.tick().await;

            if started.elapsed() >= self.config.timeout {
                on_progress(JobPhase::Failed, progress);
                return PollOutcome::Failed {
                    error: TIMEOUT_MESSAGE.to_string(),
                };
            }

            match self.source.fetch_status(job_id).await {
                Ok(status) => match status.status {
                    JobStatus::Completed => {
                        on_progress(JobPhase::Completed, 100);
                        return PollOutcome::Completed {
                            download_url: status.download_url,
                            metadata: status.metadata,
                        };
                    }
                    JobStatus::Failed => {
                        on_progress(JobPhase::Failed, progress);
                        return PollOutcome::Failed {
                            error: status
                                .error
                                .unwrap_or_else(|| "Conversion failed".to_string()),
                        };
                    }
                    JobStatus::Queued | JobStatus::Processing => {
                        // Cosmetic nudge so the bar keeps moving
                        progress = progress
                            .max(status.progress)
                            .saturating_add(PROGRESS_NUDGE)
                            .min(PROGRESS_CAP);
                        on_progress(JobPhase::Processing, progress);
                    }
                },
                Err(err) => {
                    tracing::debug!(job_id = %job_id, error = %err, "Status query failed");
                    on_progress(JobPhase::Failed, progress);
                    return PollOutcome::Failed {
                        error: STATUS_CHECK_FAILED.to_string(),
                    };
                }
            }
        }
    }
}
