//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::convert::{Dispatcher, ExecutorRegistry};
use crate::jobs::JobStore;
use crate::storage::Staging;
use crate::usage::UsageLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    jobs: JobStore,
    staging: Staging,
    limiter: Arc<dyn UsageLimiter>,
    dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(
        config: Config,
        registry: ExecutorRegistry,
        limiter: Arc<dyn UsageLimiter>,
    ) -> Self {
        let jobs = JobStore::new();
        let staging = Staging::new(&config.staging);
        let dispatcher = Dispatcher::new(
            jobs.clone(),
            Arc::new(registry),
            config.limits.max_concurrent_jobs,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                jobs,
                staging,
                limiter,
                dispatcher,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn jobs(&self) -> &JobStore {
        &self.inner.jobs
    }

    pub fn staging(&self) -> &Staging {
        &self.inner.staging
    }

    pub fn limiter(&self) -> &dyn UsageLimiter {
        self.inner.limiter.as_ref()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}
