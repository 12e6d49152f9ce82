//! Staging directories and the expiry sweep

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::config::StagingConfig;

/// Handle to the upload/output staging directories
#[derive(Clone)]
pub struct Staging {
    upload_dir: PathBuf,
    output_dir: PathBuf,
    expiry: Duration,
}

/// Result of one expiry sweep
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted_count: usize,
    pub deleted_files: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl Staging {
    pub fn new(config: &StagingConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
            expiry: Duration::from_secs(config.file_expiry_hours.max(0) as u64 * 3600),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    /// Persist uploaded bytes under a unique name, keeping the original
    /// extension
    pub async fn write_upload(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let file_name = match Path::new(original_name).extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_string_lossy()),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.upload_dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;

        Ok(path)
    }

    /// Best-effort deletion; deleting a file that is already gone is fine
    pub async fn remove_quiet(path: &Path) {
        if let Err(err) = tokio::fs::remove_file(path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %err, "Failed to remove staged file");
            }
        }
    }

    /// Delete staged files older than the expiry window in both directories
    pub async fn cleanup_expired(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for dir in [&self.upload_dir, &self.output_dir] {
            self.cleanup_directory(dir, &mut report).await;
        }

        if report.deleted_count > 0 {
            tracing::info!(count = report.deleted_count, "Cleaned up expired staged files");
        }

        report
    }

    async fn cleanup_directory(&self, dir: &Path, report: &mut CleanupReport) {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
            Err(err) => {
                report.errors.push(format!("Failed to read {}: {}", dir.display(), err));
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    report.errors.push(format!("Failed to read {}: {}", dir.display(), err));
                    break;
                }
            };

            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) => {
                    report.errors.push(format!("Failed to stat {}: {}", path.display(), err));
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok());

            if age.is_some_and(|age| age >= self.expiry) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        report.deleted_count += 1;
                        report.deleted_files.push(path);
                    }
                    Err(err) => {
                        report.errors.push(format!("Failed to delete {}: {}", path.display(), err));
                    }
                }
            }
        }
    }

    /// Start the periodic sweep
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));

            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}
