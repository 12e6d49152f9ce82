//! Usage limiter trait and the in-process fixed-window implementation

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::config::LimitsConfig;

use super::identity::Identity;
use super::types::{RateLimitDecision, UsageCheck, UsageData, UserTier};

/// Gate consulted before admitting an upload or a conversion
///
/// Durable implementations (Redis, database) live outside this crate; the
/// core only depends on this interface.
#[async_trait]
pub trait UsageLimiter: Send + Sync {
    async fn user_tier(&self, identity: &Identity) -> UserTier;

    /// IP abuse throttle. Consumes one slot per call.
    async fn check_ip(&self, ip: &str) -> RateLimitDecision;

    /// Daily conversion quota for the identity. Does not consume; quota is
    /// spent through `record_conversion`.
    async fn check_usage(&self, identity: &Identity) -> UsageCheck;

    /// Record a performed conversion and the bytes it processed
    async fn record_conversion(&self, identity: &Identity, bytes_processed: u64);

    async fn current_usage(&self, identity: &Identity) -> UsageData;
}

struct WindowEntry {
    count: u32,
    bytes: u64,
    reset_at: DateTime<Utc>,
}

/// Fixed-window in-memory limiter
///
/// Windows start at an identity's first request: one hour for the IP
/// throttle, one day for conversion quotas. Premium membership comes from
/// configuration.
#[derive(Clone)]
pub struct InMemoryUsageLimiter {
    inner: Arc<LimiterInner>,
}

struct LimiterInner {
    limits: LimitsConfig,
    premium_ids: HashSet<String>,
    daily: RwLock<HashMap<String, WindowEntry>>,
    ip: RwLock<HashMap<String, WindowEntry>>,
}

impl InMemoryUsageLimiter {
    pub fn new(limits: LimitsConfig) -> Self {
        let premium_ids = limits.premium_user_ids.iter().cloned().collect();
        Self {
            inner: Arc::new(LimiterInner {
                limits,
                premium_ids,
                daily: RwLock::new(HashMap::new()),
                ip: RwLock::new(HashMap::new()),
            }),
        }
    }

    fn daily_limit(&self, tier: UserTier) -> u32 {
        match tier {
            UserTier::Premium => self.inner.limits.daily_limit_premium,
            UserTier::Free | UserTier::Anonymous => self.inner.limits.daily_limit_free,
        }
    }

    fn tier_of(&self, identity: &Identity) -> UserTier {
        match &identity.user_id {
            Some(user_id) if self.inner.premium_ids.contains(user_id) => UserTier::Premium,
            Some(_) => UserTier::Free,
            None => UserTier::Anonymous,
        }
    }

    async fn usage_snapshot(&self, identity: &Identity) -> UsageData {
        let tier = self.tier_of(identity);
        let daily_limit = self.daily_limit(tier);
        let now = Utc::now();

        let daily = self.inner.daily.read().await;
        let (used, reset_date) = match daily.get(identity.key()) {
            Some(entry) if entry.reset_at > now => (entry.count, entry.reset_at),
            _ => (0, now + Duration::days(1)),
        };

        UsageData {
            conversions_used: used,
            conversions_remaining: daily_limit.saturating_sub(used),
            daily_limit,
            reset_date,
            tier,
        }
    }
}

#[async_trait]
impl UsageLimiter for InMemoryUsageLimiter {
    async fn user_tier(&self, identity: &Identity) -> UserTier {
        self.tier_of(identity)
    }

    async fn check_ip(&self, ip: &str) -> RateLimitDecision {
        let limit = self.inner.limits.ip_limit_per_hour;
        let now = Utc::now();
        let mut windows = self.inner.ip.write().await;

        let entry = windows.entry(ip.to_string()).or_insert_with(|| WindowEntry {
            count: 0,
            bytes: 0,
            reset_at: now + Duration::hours(1),
        });
        if entry.reset_at <= now {
            entry.count = 0;
            entry.reset_at = now + Duration::hours(1);
        }

        if entry.count >= limit {
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset: entry.reset_at,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit - entry.count,
            reset: entry.reset_at,
        }
    }

    async fn check_usage(&self, identity: &Identity) -> UsageCheck {
        let usage = self.usage_snapshot(identity).await;

        if usage.conversions_remaining == 0 {
            let message = format!(
                "Daily limit of {} conversions reached. Resets at {}",
                usage.daily_limit,
                usage.reset_date.to_rfc3339()
            );
            return UsageCheck {
                allowed: false,
                usage,
                message: Some(message),
            };
        }

        UsageCheck {
            allowed: true,
            usage,
            message: None,
        }
    }

    async fn record_conversion(&self, identity: &Identity, bytes_processed: u64) {
        let now = Utc::now();
        let mut daily = self.inner.daily.write().await;

        let entry = daily
            .entry(identity.key().to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                bytes: 0,
                reset_at: now + Duration::days(1),
            });
        if entry.reset_at <= now {
            entry.count = 0;
            entry.bytes = 0;
            entry.reset_at = now + Duration::days(1);
        }

        entry.count += 1;
        entry.bytes += bytes_processed;

        tracing::debug!(
            identity = %identity.key(),
            conversions = entry.count,
            bytes = entry.bytes,
            "Recorded conversion"
        );
    }

    async fn current_usage(&self, identity: &Identity) -> UsageData {
        self.usage_snapshot(identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> InMemoryUsageLimiter {
        let mut limits = LimitsConfig {
            max_file_size_free: 10 * 1024 * 1024,
            max_file_size_premium: 50 * 1024 * 1024,
            max_files_free: 5,
            max_files_premium: 20,
            daily_limit_free: 2,
            daily_limit_premium: 1000,
            ip_limit_per_hour: 3,
            max_concurrent_jobs: 0,
            premium_user_ids: Vec::new(),
        };
        limits.premium_user_ids.push("user-premium".to_string());
        InMemoryUsageLimiter::new(limits)
    }

    fn user(id: &str) -> Identity {
        Identity {
            user_id: Some(id.to_string()),
            fingerprint: None,
            ip: "198.51.100.4".to_string(),
        }
    }

    #[tokio::test]
    async fn test_tier_resolution() {
        let limiter = limiter();
        assert_eq!(limiter.user_tier(&user("user-premium")).await, UserTier::Premium);
        assert_eq!(limiter.user_tier(&user("user-free")).await, UserTier::Free);
        assert_eq!(
            limiter.user_tier(&Identity::anonymous("198.51.100.4")).await,
            UserTier::Anonymous
        );
    }

    #[tokio::test]
    async fn test_daily_quota_exhausts() {
        let limiter = limiter();
        let identity = user("user-free");

        let check = limiter.check_usage(&identity).await;
        assert!(check.allowed);
        assert_eq!(check.usage.conversions_remaining, 2);

        limiter.record_conversion(&identity, 1024).await;
        limiter.record_conversion(&identity, 1024).await;

        let check = limiter.check_usage(&identity).await;
        assert!(!check.allowed);
        assert_eq!(check.usage.conversions_used, 2);
        assert_eq!(check.usage.conversions_remaining, 0);
        assert!(check.message.unwrap().contains("Daily limit of 2"));
    }

    #[tokio::test]
    async fn test_quota_is_per_identity() {
        let limiter = limiter();
        limiter.record_conversion(&user("a"), 0).await;
        limiter.record_conversion(&user("a"), 0).await;

        assert!(!limiter.check_usage(&user("a")).await.allowed);
        assert!(limiter.check_usage(&user("b")).await.allowed);
    }

    #[tokio::test]
    async fn test_premium_gets_higher_limit() {
        let limiter = limiter();
        let check = limiter.check_usage(&user("user-premium")).await;
        assert_eq!(check.usage.daily_limit, 1000);
        assert_eq!(check.usage.tier, UserTier::Premium);
    }

    #[tokio::test]
    async fn test_ip_throttle_consumes_and_blocks() {
        let limiter = limiter();

        for i in 0..3 {
            let decision = limiter.check_ip("203.0.113.9").await;
            assert!(decision.allowed, "request {i} should pass");
            assert_eq!(decision.remaining, 2 - i);
        }

        let decision = limiter.check_ip("203.0.113.9").await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reset > Utc::now());

        // Separate IPs do not interfere
        assert!(limiter.check_ip("203.0.113.10").await.allowed);
    }
}
