//! Conversion executor seam
//!
//! Executors perform the actual byte-level conversions and are treated as
//! opaque black boxes by the dispatcher: input path(s) and options in, output
//! path out, descriptive error on failure. Concrete implementations (PDF
//! rendering, DOCX generation, image codecs) are wired in by the deployment;
//! tests register lightweight fakes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::ConversionType;

/// Input to an executor: one file for most types, several for merge
#[derive(Debug, Clone)]
pub enum ExecutorInput {
    Single(PathBuf),
    Many(Vec<PathBuf>),
}

impl ExecutorInput {
    /// All input paths, regardless of arity
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            ExecutorInput::Single(path) => vec![path.as_path()],
            ExecutorInput::Many(paths) => paths.iter().map(PathBuf::as_path).collect(),
        }
    }
}

/// What a settled executor hands back
#[derive(Debug, Clone)]
pub struct ExecutorOutput {
    pub output_path: PathBuf,
    /// Free-form extras surfaced to the client (e.g. compression ratio)
    pub metadata: Option<Map<String, Value>>,
}

impl From<PathBuf> for ExecutorOutput {
    fn from(output_path: PathBuf) -> Self {
        Self {
            output_path,
            metadata: None,
        }
    }
}

/// Executor failure: a human-readable message, plus the partially written
/// output when one exists so the dispatcher can clean it up
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ExecutorError {
    pub message: String,
    pub partial_output: Option<PathBuf>,
}

impl ExecutorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            partial_output: None,
        }
    }

    pub fn with_partial_output(message: impl Into<String>, partial_output: PathBuf) -> Self {
        Self {
            message: message.into(),
            partial_output: Some(partial_output),
        }
    }
}

impl From<std::io::Error> for ExecutorError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// One conversion strategy
#[async_trait]
pub trait ConversionExecutor: Send + Sync {
    async fn execute(
        &self,
        input: &ExecutorInput,
        options: &Map<String, Value>,
    ) -> Result<ExecutorOutput, ExecutorError>;
}

/// Maps conversion types to their executors
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<ConversionType, Arc<dyn ConversionExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        conversion_type: ConversionType,
        executor: Arc<dyn ConversionExecutor>,
    ) {
        self.executors.insert(conversion_type, executor);
    }

    pub fn get(&self, conversion_type: ConversionType) -> Option<Arc<dyn ConversionExecutor>> {
        self.executors.get(&conversion_type).cloned()
    }

    pub fn supported_types(&self) -> Vec<ConversionType> {
        let mut types: Vec<_> = self.executors.keys().copied().collect();
        types.sort_by_key(|ty| ty.as_str());
        types
    }
}
