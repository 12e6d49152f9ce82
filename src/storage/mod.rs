//! Staging storage
//!
//! Uploaded inputs and conversion outputs live as transient files in local
//! staging directories. Nothing here is durable; the expiry sweep deletes
//! anything older than the configured window.

mod staging;

pub use staging::{CleanupReport, Staging};
