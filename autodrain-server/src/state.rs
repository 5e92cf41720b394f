//! Application state shared across all request handlers.

use autodrain_core::events::EventSink;
use autodrain_core::processors::Orchestrator;
use autodrain_sdk::objects::ReservePolicy;
use std::time::Duration;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Bounds applied to `start` commands before they reach the orchestrator.
    pub reserve_policy: ReservePolicy,
    /// Deadline used when joining a stopped run for its report.
    pub stop_grace: Duration,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, reserve_policy: ReservePolicy, stop_grace: Duration) -> Self {
        Self {
            orchestrator,
            reserve_policy,
            stop_grace,
        }
    }

    pub fn sink(&self) -> &EventSink {
        self.orchestrator.sink()
    }
}
