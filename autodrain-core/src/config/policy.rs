use std::time::Duration;

use crate::ledger::{ErrorClass, LedgerError};
use crate::utils::jitter::JitterRange;

/// Cap on the exponent so the multiplication never overflows.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Retry delays after a failed ledger call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    /// `base * 2^(failures - 1)`, capped at `max`.
    pub fn exponential(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.base.saturating_mul(2u32.pow(exponent)).min(self.max)
    }

    /// Delay before retrying after `error`, the `failures`-th failure in a
    /// row.
    ///
    /// Sequence conflicts and fee bumps are resolved by re-reading the
    /// account, so they retry after the base delay. Rate limits wait at least
    /// as long as the server asked.
    pub fn delay_for(&self, error: &LedgerError, failures: u32) -> Duration {
        match error.class() {
            ErrorClass::SequenceConflict | ErrorClass::InsufficientFee => self.base.min(self.max),
            ErrorClass::RateLimited => {
                let backoff = self.exponential(failures);
                error.retry_after().map_or(backoff, |hint| hint.max(backoff))
            }
            ErrorClass::Connectivity | ErrorClass::Rejected | ErrorClass::NotFound => {
                self.exponential(failures)
            }
        }
    }
}

/// Pacing and reporting knobs shared by every worker of a run.
#[derive(Debug, Clone)]
pub struct WorkerPolicy {
    /// Wait after a poll that found nothing to send.
    pub idle_delay: Duration,
    pub jitter: JitterRange,
    /// Minimum gap between identical "balance too low" warnings.
    pub warn_interval: Duration,
    pub backoff: BackoffPolicy,
    /// Upper bound on a single ledger call. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Explorer URL prefix; the transaction hash is appended.
    pub explorer_tx_url: Option<String>,
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self {
            idle_delay: Duration::from_millis(100),
            jitter: JitterRange::default(),
            warn_interval: Duration::from_secs(5),
            backoff: BackoffPolicy::default(),
            request_timeout: None,
            explorer_tx_url: None,
        }
    }
}

impl WorkerPolicy {
    pub fn explorer_link(&self, hash: &str) -> Option<String> {
        self.explorer_tx_url
            .as_deref()
            .map(|prefix| format!("{}/{hash}", prefix.trim_end_matches('/')))
    }
}
