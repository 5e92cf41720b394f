//! Processors driving the drain runs.
//!
//! - `Orchestrator`: receives `ControlCommand`, spawns and stops workers
//! - `DrainWorker`: polls one account and drains it above the reserve

pub mod drain_worker;
pub mod orchestrator;

pub use drain_worker::{DrainWorker, WorkerExit};
pub use orchestrator::{
    ControlCommand, ControlOutcome, Orchestrator, RunJoinError, RunReport, StartOutcome,
    StoppedRun,
};
