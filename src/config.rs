//! Configuration for the Docmill server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub staging: StagingConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StagingConfig {
    /// Directory uploaded files are staged into before conversion
    pub upload_dir: PathBuf,
    /// Directory executors write their results into
    pub output_dir: PathBuf,
    /// Staged files older than this are swept
    pub file_expiry_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub max_file_size_free: u64,
    pub max_file_size_premium: u64,
    pub max_files_free: usize,
    pub max_files_premium: usize,
    pub daily_limit_free: u32,
    pub daily_limit_premium: u32,
    pub ip_limit_per_hour: u32,
    /// Upper bound on simultaneously running conversion jobs (0 = unlimited)
    pub max_concurrent_jobs: usize,
    /// User ids treated as premium by the in-process limiter
    pub premium_user_ids: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            staging: StagingConfig {
                upload_dir: PathBuf::from("./uploads"),
                output_dir: PathBuf::from("./outputs"),
                file_expiry_hours: 1,
            },
            limits: LimitsConfig {
                max_file_size_free: 10 * 1024 * 1024,
                max_file_size_premium: 50 * 1024 * 1024,
                max_files_free: 5,
                max_files_premium: 20,
                daily_limit_free: 5,
                daily_limit_premium: 1000,
                ip_limit_per_hour: 20,
                max_concurrent_jobs: 0,
                premium_user_ids: Vec::new(),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env_parse("SERVER_PORT", defaults.server.port),
            },
            staging: StagingConfig {
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.staging.upload_dir),
                output_dir: env::var("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.staging.output_dir),
                file_expiry_hours: env_parse("FILE_EXPIRY_HOURS", defaults.staging.file_expiry_hours),
            },
            limits: LimitsConfig {
                max_file_size_free: env_parse("MAX_FILE_SIZE_FREE", defaults.limits.max_file_size_free),
                max_file_size_premium: env_parse(
                    "MAX_FILE_SIZE_PREMIUM",
                    defaults.limits.max_file_size_premium,
                ),
                max_files_free: env_parse("MAX_FILES_FREE", defaults.limits.max_files_free),
                max_files_premium: env_parse("MAX_FILES_PREMIUM", defaults.limits.max_files_premium),
                daily_limit_free: env_parse("DAILY_LIMIT_FREE", defaults.limits.daily_limit_free),
                daily_limit_premium: env_parse(
                    "DAILY_LIMIT_PREMIUM",
                    defaults.limits.daily_limit_premium,
                ),
                ip_limit_per_hour: env_parse("IP_LIMIT_PER_HOUR", defaults.limits.ip_limit_per_hour),
                max_concurrent_jobs: env_parse(
                    "MAX_CONCURRENT_JOBS",
                    defaults.limits.max_concurrent_jobs,
                ),
                premium_user_ids: env::var("PREMIUM_USER_IDS")
                    .map(|v| {
                        v.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }
}
