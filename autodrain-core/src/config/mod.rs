//! Runtime configuration types for the drain workers.
//!
//! These are validated runtime values. Loading and parsing them from a file
//! is handled by the server crate.

mod policy;
mod worker;

pub use policy::{BackoffPolicy, WorkerPolicy};
pub use worker::{DrainPlan, PlanError, WorkerConfig};
