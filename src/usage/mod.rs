//! Usage metering and rate limiting
//!
//! Admission control for the pipeline: an IP-level abuse throttle, a daily
//! per-identity conversion quota, and subscription-tier lookups. The durable
//! backend (Redis/database) is an external collaborator behind the
//! [`UsageLimiter`] trait; the bundled [`InMemoryUsageLimiter`] is the
//! in-process fallback.

mod identity;
mod limiter;
mod types;

pub use identity::{client_ip, Identity};
pub use limiter::{InMemoryUsageLimiter, UsageLimiter};
pub use types::{RateLimitDecision, UsageCheck, UsageData, UserTier};
