//! Event type definitions.

use autodrain_sdk::objects::{LogLevel, ServerMessage};
use time::OffsetDateTime;

/// 1-based ordinal of a drain worker within its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Log,
    /// Run-state transition or snapshot.
    Status { running: bool },
}

/// A single observable event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: OffsetDateTime,
    pub worker: Option<WorkerId>,
}

impl Event {
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Log,
            level,
            message: message.into(),
            timestamp: OffsetDateTime::now_utc(),
            worker: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Success, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    pub fn status(running: bool) -> Self {
        let message = if running { "running" } else { "stopped" };
        Self {
            kind: EventKind::Status { running },
            level: LogLevel::Info,
            message: message.to_string(),
            timestamp: OffsetDateTime::now_utc(),
            worker: None,
        }
    }

    /// Tag the event with the worker that produced it.
    pub fn from_worker(mut self, worker: WorkerId) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn is_status(&self) -> bool {
        matches!(self.kind, EventKind::Status { .. })
    }
}

impl From<&Event> for ServerMessage {
    fn from(event: &Event) -> Self {
        match event.kind {
            EventKind::Status { running } => ServerMessage::Status { running },
            EventKind::Log => ServerMessage::Log {
                level: event.level,
                message: event.message.clone(),
                timestamp: event.timestamp.unix_timestamp(),
                worker: event.worker.map(|w| w.0),
            },
        }
    }
}
