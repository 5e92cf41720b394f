//! Remote ledger access.
//!
//! The [`Ledger`] trait is the only thing drain workers know about the
//! network. [`horizon::HorizonLedger`] implements it against a Horizon REST
//! server; tests use an in-memory fake.

pub mod horizon;
pub mod xdr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

use crate::keys::{AccountId, SigningKey};

pub use horizon::{HorizonConfig, HorizonLedger};

/// Account state fetched on every poll. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub account: AccountId,
    /// Native asset balance.
    pub balance: Decimal,
    /// Current sequence number; the next transaction uses `sequence + 1`.
    pub sequence: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub destination: AccountId,
    /// Native amount, at most seven fractional digits.
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Hex transaction hash.
    pub hash: String,
    pub ledger: Option<u32>,
}

/// Coarse failure class used to pick a retry delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Connectivity,
    RateLimited,
    SequenceConflict,
    InsufficientFee,
    Rejected,
    NotFound,
}

/// Transaction-level result code reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxRejection {
    BadSequence,
    InsufficientFee,
    InsufficientBalance,
    /// Operation-level failure: the source cannot cover the payment.
    Underfunded,
    /// Operation-level failure: the destination account does not exist.
    NoDestination,
    TooLate,
    Other(String),
}

impl TxRejection {
    /// Map Horizon `extras.result_codes` into a rejection.
    ///
    /// Operation codes are only consulted when the transaction code is the
    /// generic `tx_failed`.
    pub fn from_result_codes(transaction: &str, operations: &[String]) -> Self {
        match transaction {
            "tx_bad_seq" => Self::BadSequence,
            "tx_insufficient_fee" => Self::InsufficientFee,
            "tx_insufficient_balance" => Self::InsufficientBalance,
            "tx_too_late" => Self::TooLate,
            "tx_failed" => match operations.iter().find(|op| op.as_str() != "op_success") {
                Some(op) if op == "op_underfunded" => Self::Underfunded,
                Some(op) if op == "op_no_destination" => Self::NoDestination,
                Some(op) => Self::Other(op.clone()),
                None => Self::Other(transaction.to_string()),
            },
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::BadSequence => "tx_bad_seq",
            Self::InsufficientFee => "tx_insufficient_fee",
            Self::InsufficientBalance => "tx_insufficient_balance",
            Self::Underfunded => "op_underfunded",
            Self::NoDestination => "op_no_destination",
            Self::TooLate => "tx_too_late",
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for TxRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transport failure or a 5xx response.
    #[error("ledger unreachable: {0}")]
    Connectivity(String),

    #[error("ledger call timed out after {0:?}")]
    Timeout(Duration),

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("rate limited by ledger")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transaction rejected: {rejection}")]
    Rejected {
        rejection: TxRejection,
        operations: Vec<String>,
    },

    /// The server answered with something we could not interpret.
    #[error("unexpected ledger response: {0}")]
    Malformed(String),
}

impl LedgerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Connectivity(_) | Self::Timeout(_) | Self::Malformed(_) => {
                ErrorClass::Connectivity
            }
            Self::AccountNotFound(_) => ErrorClass::NotFound,
            Self::RateLimited { .. } => ErrorClass::RateLimited,
            Self::Rejected { rejection, .. } => match rejection {
                TxRejection::BadSequence => ErrorClass::SequenceConflict,
                TxRejection::InsufficientFee => ErrorClass::InsufficientFee,
                _ => ErrorClass::Rejected,
            },
        }
    }

    /// Server-provided retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Connectivity(e.to_string())
        }
    }
}

/// Ledger operations needed by a drain worker.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch the current native balance and sequence number.
    async fn load_account(&self, account: &AccountId) -> Result<AccountSnapshot, LedgerError>;

    /// Build, sign and submit a single native payment from `source`.
    async fn submit_payment(
        &self,
        signer: &dyn SigningKey,
        source: &AccountSnapshot,
        payment: &PaymentRequest,
    ) -> Result<PaymentReceipt, LedgerError>;
}
