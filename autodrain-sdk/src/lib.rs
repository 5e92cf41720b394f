//! Wire types for the autodrain control protocol.
//!
//! The server exposes a single WebSocket endpoint. Operators send
//! [`objects::ClientCommand`] frames and receive [`objects::ServerMessage`]
//! frames. With the `client` feature enabled, [`client::ControlClient`]
//! speaks the protocol from Rust.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
