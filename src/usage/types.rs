use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription level governing quotas and file-size ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserTier {
    Anonymous,
    Free,
    Premium,
}

/// Outcome of a rate-limit check, with enough data for the client to render
/// a retry affordance
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset: DateTime<Utc>,
}

/// Current metering state for one identity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageData {
    pub conversions_used: u32,
    pub conversions_remaining: u32,
    pub daily_limit: u32,
    pub reset_date: DateTime<Utc>,
    pub tier: UserTier,
}

/// Quota check result
#[derive(Debug, Clone)]
pub struct UsageCheck {
    pub allowed: bool,
    pub usage: UsageData,
    pub message: Option<String>,
}
