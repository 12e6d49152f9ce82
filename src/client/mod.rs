//! Client-side conversion flow
//!
//! The server never pushes; clients drive the pipeline by uploading,
//! dispatching, and then polling job status until a terminal state or a
//! local timeout. The poller's progress value is cosmetic feedback, not a
//! measurement. There is no cancel protocol: dropping the poll future stops
//! the interval while the server-side job runs on.

mod http;
mod poller;
mod types;

pub use http::{ConvertClient, HttpStatusSource};
pub use poller::{JobPoller, StatusSource};
pub use types::{ClientError, JobPhase, JobStatusResponse, PollConfig, PollError, PollOutcome};
