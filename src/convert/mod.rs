//! Conversion pipeline
//!
//! The dispatcher validates a conversion request, creates a job record, and
//! runs the matching executor as a detached task. Executors are opaque
//! per-type strategies behind [`ConversionExecutor`]; the byte-level
//! conversion work lives outside this crate.

mod dispatcher;
mod executor;
mod types;

pub use dispatcher::Dispatcher;
pub use executor::{
    ConversionExecutor, ExecutorError, ExecutorInput, ExecutorOutput, ExecutorRegistry,
};
pub use types::{ConversionType, ConvertError, ConvertRequest};
