//! The `start` command payload and its boundary validation.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Raw `start` configuration as sent by a client.
///
/// Browser clients send a single `senderMnemonic` / `recipientAddress`
/// pair; both names are accepted as aliases. A single string in `accounts` is split into one credential per
/// non-blank line.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConfig {
    #[serde(default, alias = "senderMnemonic", deserialize_with = "one_or_many")]
    pub accounts: Vec<String>,
    #[serde(default, alias = "recipientAddress")]
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve_amount: Option<AmountInput>,
}

impl std::fmt::Debug for StartConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartConfig")
            .field("accounts", &format_args!("[{} redacted]", self.accounts.len()))
            .field("destination", &self.destination)
            .field("reserve_amount", &self.reserve_amount)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => s.lines().map(str::to_owned).collect(),
        OneOrMany::Many(v) => v,
    })
}

/// A reserve amount as typed by the operator: either a JSON number or a
/// string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(serde_json::Number),
    Text(String),
}

impl AmountInput {
    /// Parse into a decimal. Blank text yields `Ok(None)`.
    pub fn to_decimal(&self) -> Result<Option<Decimal>, ValidationError> {
        let raw = match self {
            AmountInput::Number(n) => n.to_string(),
            AmountInput::Text(s) if s.trim().is_empty() => return Ok(None),
            AmountInput::Text(s) => s.trim().to_owned(),
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map(Some)
            .map_err(|_| ValidationError::InvalidReserve(raw))
    }
}

/// Bounds applied to the reserve amount at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservePolicy {
    /// Smallest accepted reserve.
    pub minimum: Decimal,
    /// Reserve used when the client leaves the field empty.
    pub default: Decimal,
}

impl Default for ReservePolicy {
    fn default() -> Self {
        Self {
            minimum: Decimal::ONE,
            default: Decimal::new(101, 2),
        }
    }
}

/// Reasons a `start` command is rejected before reaching the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one account credential is required")]
    NoAccounts,

    #[error("a destination address is required")]
    MissingDestination,

    #[error("reserve amount {0:?} is not a number")]
    InvalidReserve(String),

    #[error("reserve amount must be at least {minimum}, got {value}")]
    ReserveTooLow { value: Decimal, minimum: Decimal },
}

/// A `start` configuration that passed boundary validation.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedStart {
    /// Trimmed, non-blank credentials in the order they were supplied.
    pub accounts: Vec<String>,
    pub destination: String,
    pub reserve: Decimal,
}

impl std::fmt::Debug for ValidatedStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedStart")
            .field("accounts", &format_args!("[{} redacted]", self.accounts.len()))
            .field("destination", &self.destination)
            .field("reserve", &self.reserve)
            .finish()
    }
}

impl StartConfig {
    pub fn validate(&self, policy: &ReservePolicy) -> Result<ValidatedStart, ValidationError> {
        let accounts: Vec<String> = self
            .accounts
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_owned)
            .collect();
        if accounts.is_empty() {
            return Err(ValidationError::NoAccounts);
        }

        let destination = self.destination.trim();
        if destination.is_empty() {
            return Err(ValidationError::MissingDestination);
        }

        let reserve = match &self.reserve_amount {
            Some(input) => input.to_decimal()?.unwrap_or(policy.default),
            None => policy.default,
        };
        let minimum = policy.minimum.max(Decimal::ZERO);
        if reserve < minimum {
            return Err(ValidationError::ReserveTooLow {
                value: reserve,
                minimum,
            });
        }

        Ok(ValidatedStart {
            accounts,
            destination: destination.to_owned(),
            reserve,
        })
    }
}
