//! Worker output and run-state events.
//!
//! # Event Flow
//!
//! 1. Drain workers and the orchestrator build [`Event`]s and hand them to
//!    the shared [`EventSink`].
//! 2. The sink mirrors every event into `tracing` and broadcasts it to the
//!    attached observers.
//! 3. Each observer holds an [`EventSubscription`] whose first item is a
//!    status snapshot.
//!
//! Events are ephemeral: nothing is buffered for observers that attach
//! later.

pub mod sink;
pub mod types;

pub use sink::{DEFAULT_EVENT_BUFFER, EventSink, EventSubscription, SinkMode};
pub use types::{Event, EventKind, WorkerId};
