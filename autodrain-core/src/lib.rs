#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod config;
pub mod events;
pub mod keys;
pub mod ledger;
pub mod processors;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
