//! Upload admission and staging
//!
//! Validation runs in a fixed order: IP abuse throttle, identity daily
//! quota, tier file-size ceiling, MIME allow-list. The first violated
//! constraint aborts the upload before anything touches disk, and is
//! reported specifically so the client can render an actionable message.

use axum::body::Bytes;
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::storage::Staging;
use crate::usage::{Identity, UsageLimiter, UserTier};

use super::types::{UploadError, UploadedFile, ALLOWED_MIME_TYPES, MERGE_MIME_TYPES};

/// A file as received from the multipart body, not yet admitted
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Admit and stage a single upload
pub async fn store_upload(
    staging: &Staging,
    limiter: &dyn UsageLimiter,
    limits: &LimitsConfig,
    identity: &Identity,
    file: IncomingFile,
) -> Result<UploadedFile, UploadError> {
    let tier = admit(limiter, identity).await?;

    validate_file(&file, tier, limits, ALLOWED_MIME_TYPES)?;

    stage(staging, file).await
}

/// Admit and stage a batch upload (merge inputs): same gate, plus a per-tier
/// file-count ceiling and the PDF-only allow-list
pub async fn store_batch(
    staging: &Staging,
    limiter: &dyn UsageLimiter,
    limits: &LimitsConfig,
    identity: &Identity,
    files: Vec<IncomingFile>,
) -> Result<Vec<UploadedFile>, UploadError> {
    let tier = admit(limiter, identity).await?;

    if files.is_empty() {
        return Err(UploadError::MissingFile);
    }

    let max_files = match tier {
        UserTier::Premium => limits.max_files_premium,
        UserTier::Free | UserTier::Anonymous => limits.max_files_free,
    };
    if files.len() > max_files {
        return Err(UploadError::TooManyFiles {
            count: files.len(),
            max: max_files,
        });
    }

    // Validate the whole batch before staging any of it
    for file in &files {
        validate_file(file, tier, limits, MERGE_MIME_TYPES)?;
    }

    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        staged.push(stage(staging, file).await?);
    }
    Ok(staged)
}

/// Shared admission gate: IP throttle first, then the identity quota
async fn admit(limiter: &dyn UsageLimiter, identity: &Identity) -> Result<UserTier, UploadError> {
    let ip_decision = limiter.check_ip(&identity.ip).await;
    if !ip_decision.allowed {
        return Err(UploadError::IpThrottled {
            limit: ip_decision.limit,
            reset: ip_decision.reset,
        });
    }

    let tier = limiter.user_tier(identity).await;

    let usage = limiter.check_usage(identity).await;
    if !usage.allowed {
        let message = usage.message.unwrap_or_else(|| {
            format!(
                "Daily limit of {} conversions reached.",
                usage.usage.daily_limit
            )
        });
        return Err(UploadError::QuotaExceeded {
            message,
            limit: usage.usage.daily_limit,
            remaining: usage.usage.conversions_remaining,
            reset: usage.usage.reset_date,
            tier,
        });
    }

    Ok(tier)
}

fn validate_file(
    file: &IncomingFile,
    tier: UserTier,
    limits: &LimitsConfig,
    allowed_types: &[&str],
) -> Result<(), UploadError> {
    let max = match tier {
        UserTier::Premium => limits.max_file_size_premium,
        UserTier::Free | UserTier::Anonymous => limits.max_file_size_free,
    };
    let size = file.bytes.len() as u64;
    if size > max {
        return Err(UploadError::FileTooLarge { size, max });
    }

    if !allowed_types.contains(&file.mime_type.as_str()) {
        return Err(UploadError::UnsupportedType(file.mime_type.clone()));
    }

    Ok(())
}

async fn stage(staging: &Staging, file: IncomingFile) -> Result<UploadedFile, UploadError> {
    let file_path = staging.write_upload(&file.file_name, &file.bytes).await?;
    let handle = UploadedFile {
        file_id: Uuid::new_v4(),
        file_name: file.file_name,
        file_size: file.bytes.len() as u64,
        file_path,
        mime_type: file.mime_type,
    };

    tracing::info!(
        file_id = %handle.file_id,
        file_name = %handle.file_name,
        file_size = handle.file_size,
        "File staged"
    );

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::usage::InMemoryUsageLimiter;
    use std::path::Path;

    fn fixtures(dir: &Path) -> (Staging, InMemoryUsageLimiter, LimitsConfig) {
        let mut config = Config::default();
        config.staging.upload_dir = dir.join("uploads");
        config.staging.output_dir = dir.join("outputs");
        config.limits.max_file_size_free = 64;
        config.limits.max_file_size_premium = 1024;
        config.limits.daily_limit_free = 1;
        config.limits.max_files_free = 2;
        config.limits.premium_user_ids = vec!["user-premium".to_string()];

        let limiter = InMemoryUsageLimiter::new(config.limits.clone());
        (Staging::new(&config.staging), limiter, config.limits)
    }

    fn pdf(name: &str, size: usize) -> IncomingFile {
        IncomingFile {
            file_name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: Bytes::from(vec![0u8; size]),
        }
    }

    #[tokio::test]
    async fn test_upload_stages_file() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, limiter, limits) = fixtures(tmp.path());
        let identity = Identity::anonymous("203.0.113.1");

        let handle = store_upload(&staging, &limiter, &limits, &identity, pdf("doc.pdf", 32))
            .await
            .unwrap();

        assert_eq!(handle.file_name, "doc.pdf");
        assert_eq!(handle.file_size, 32);
        assert!(handle.file_path.exists());
        assert_eq!(handle.mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_size_ceiling_depends_on_tier() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, limiter, limits) = fixtures(tmp.path());

        let err = store_upload(
            &staging,
            &limiter,
            &limits,
            &Identity::anonymous("203.0.113.1"),
            pdf("big.pdf", 100),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { size: 100, max: 64 }));

        // The same file fits under the premium ceiling
        let premium = Identity {
            user_id: Some("user-premium".to_string()),
            fingerprint: None,
            ip: "203.0.113.1".to_string(),
        };
        assert!(store_upload(&staging, &limiter, &limits, &premium, pdf("big.pdf", 100))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_mime_allow_list() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, limiter, limits) = fixtures(tmp.path());
        let identity = Identity::anonymous("203.0.113.1");

        let file = IncomingFile {
            file_name: "payload.bin".to_string(),
            mime_type: "application/octet-stream".to_string(),
            bytes: Bytes::from_static(b"1234"),
        };
        let err = store_upload(&staging, &limiter, &limits, &identity, file)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType(_)));
    }

    #[tokio::test]
    async fn test_quota_exceeded_reports_reset_data() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, limiter, limits) = fixtures(tmp.path());
        let identity = Identity::anonymous("203.0.113.1");

        // Daily limit is 1; consume it
        limiter.record_conversion(&identity, 10).await;

        let err = store_upload(&staging, &limiter, &limits, &identity, pdf("doc.pdf", 8))
            .await
            .unwrap_err();
        match err {
            UploadError::QuotaExceeded { limit, remaining, tier, .. } => {
                assert_eq!(limit, 1);
                assert_eq!(remaining, 0);
                assert_eq!(tier, UserTier::Anonymous);
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_rejects_non_pdf_before_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, limiter, limits) = fixtures(tmp.path());
        let identity = Identity::anonymous("203.0.113.1");

        let files = vec![
            pdf("a.pdf", 8),
            IncomingFile {
                file_name: "b.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes: Bytes::from_static(b"\x89PNG"),
            },
        ];
        let err = store_batch(&staging, &limiter, &limits, &identity, files)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType(_)));

        // Nothing was staged for the rejected batch
        let staged = std::fs::read_dir(staging.upload_dir())
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(staged, 0);
    }

    #[tokio::test]
    async fn test_batch_file_count_ceiling() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, limiter, limits) = fixtures(tmp.path());
        let identity = Identity::anonymous("203.0.113.1");

        let files = vec![pdf("a.pdf", 8), pdf("b.pdf", 8), pdf("c.pdf", 8)];
        let err = store_batch(&staging, &limiter, &limits, &identity, files)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::TooManyFiles { count: 3, max: 2 }));
    }
}
