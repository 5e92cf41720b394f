//! WebSocket message types for the control channel.
//!
//! # Protocol
//!
//! 1. Immediately after the upgrade the server sends one
//!    [`ServerMessage::Status`] frame with the current running state.
//! 2. The client sends [`ClientCommand`] frames at any time.
//! 3. The server streams [`ServerMessage::Log`] frames produced by the
//!    workers, plus a [`ServerMessage::Status`] frame on every start/stop
//!    transition.
//!
//! A frame that does not parse as a [`ClientCommand`] is reported back as an
//! error log and otherwise ignored; the connection stays open.

use serde::{Deserialize, Serialize};

use super::drain::StartConfig;

/// Client-to-server command.
///
/// Internally tagged on `"command"`:
///
/// ```json
/// {"command":"start","config":{"accounts":["..."],"destination":"G...","reserveAmount":"1.01"}}
/// {"command":"stop"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Start one worker per account. Ignored while already running.
    Start { config: StartConfig },
    /// Stop all workers. Ignored while stopped.
    Stop,
}

impl ClientCommand {
    /// Parse a text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Severity attached to every log frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Server-to-client message.
///
/// Internally tagged on `"type"` so browser clients can dispatch on it:
///
/// ```json
/// {"type":"log","level":"warn","message":"...","timestamp":1700000000,"worker":2}
/// {"type":"status","running":true}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Log {
        level: LogLevel,
        message: String,
        /// Unix timestamp (seconds) at which the event was produced.
        timestamp: i64,
        /// Ordinal of the worker that produced the event, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker: Option<usize>,
    },
    Status {
        running: bool,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::AmountInput;

    #[test]
    fn test_parse_stop() {
        let cmd = ClientCommand::from_json(r#"{"command":"stop"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::Stop);
    }

    #[test]
    fn test_parse_start_with_account_list() {
        let cmd = ClientCommand::from_json(
            r#"{"command":"start","config":{"accounts":["a b c","d e f"],"destination":"GDEST","reserveAmount":2.5}}"#,
        )
        .unwrap();
        let ClientCommand::Start { config } = cmd else {
            panic!("expected start");
        };
        assert_eq!(config.accounts, vec!["a b c", "d e f"]);
        assert_eq!(config.destination, "GDEST");
        assert!(matches!(config.reserve_amount, Some(AmountInput::Number(_))));
    }

    #[test]
    fn test_parse_start_with_browser_field_names() {
        let cmd = ClientCommand::from_json(
            r#"{"command":"start","config":{"senderMnemonic":"word word word","recipientAddress":"GDEST","reserveAmount":"1.01"}}"#,
        )
        .unwrap();
        let ClientCommand::Start { config } = cmd else {
            panic!("expected start");
        };
        assert_eq!(config.accounts, vec!["word word word"]);
        assert_eq!(config.destination, "GDEST");
        assert_eq!(
            config.reserve_amount,
            Some(AmountInput::Text("1.01".to_string()))
        );
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(ClientCommand::from_json(r#"{"command":"pause"}"#).is_err());
        assert!(ClientCommand::from_json("not json").is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let status = ServerMessage::Status { running: true }.to_json().unwrap();
        assert_eq!(status, r#"{"type":"status","running":true}"#);

        let log = ServerMessage::Log {
            level: LogLevel::Success,
            message: "sent".into(),
            timestamp: 10,
            worker: None,
        }
        .to_json()
        .unwrap();
        assert_eq!(
            log,
            r#"{"type":"log","level":"success","message":"sent","timestamp":10}"#
        );
    }
}
