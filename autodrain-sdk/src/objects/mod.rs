pub mod drain;
pub mod ws;

pub use drain::{AmountInput, ReservePolicy, StartConfig, ValidatedStart, ValidationError};
pub use ws::{ClientCommand, LogLevel, ServerMessage};
