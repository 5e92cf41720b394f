//! DrainWorker processor.
//!
//! One worker watches one account. It is responsible for:
//! - Resolving the account's signing key from its credential
//! - Polling the account balance and computing the sendable amount
//! - Submitting a payment of everything above the reserve
//! - Backing off after ledger failures, with jitter on every wait
//!
//! The run token is only checked between iterations, so a payment that is
//! already in flight always completes before the worker stops.

use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{WorkerConfig, WorkerPolicy};
use crate::events::{Event, EventSink, WorkerId};
use crate::keys::{KeyDeriver, SigningKey};
use crate::ledger::{AccountSnapshot, Ledger, LedgerError, PaymentRequest};
use crate::utils::amount::{format_native, sendable};
use crate::utils::throttle::WarnThrottle;

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Observed the stop signal.
    Stopped,
    /// Could not derive a signing key; never polled.
    InitFailed,
}

#[derive(Debug)]
enum State {
    Polling,
    Draining {
        snapshot: AccountSnapshot,
        amount: Decimal,
    },
    Idle(Duration),
    Backoff(Duration),
    Stopped,
}

pub struct DrainWorker {
    config: WorkerConfig,
    policy: Arc<WorkerPolicy>,
    ledger: Arc<dyn Ledger>,
    deriver: Arc<dyn KeyDeriver>,
    sink: EventSink,
    run: CancellationToken,
}

impl DrainWorker {
    pub fn new(
        config: WorkerConfig,
        policy: Arc<WorkerPolicy>,
        ledger: Arc<dyn Ledger>,
        deriver: Arc<dyn KeyDeriver>,
        sink: EventSink,
        run: CancellationToken,
    ) -> Self {
        Self {
            config,
            policy,
            ledger,
            deriver,
            sink,
            run,
        }
    }

    /// Run until the run token is cancelled.
    pub async fn run(self) -> WorkerExit {
        let signer = match self.resolve_signer().await {
            Ok(signer) => signer,
            Err(reason) => {
                self.emit(Event::error(format!("Initialization failed: {reason}")));
                return WorkerExit::InitFailed;
            }
        };

        self.emit(Event::info(format!("Source account: {}", signer.account_id())));
        self.emit(Event::info(format!(
            "Destination account: {}",
            self.config.destination
        )));
        self.emit(Event::info(format!(
            "Reserve kept: {}",
            format_native(self.config.reserve)
        )));
        self.emit(Event::info("Initialized, watching balance"));

        let mut failures: u32 = 0;
        let mut throttle = WarnThrottle::new(self.policy.warn_interval);
        let mut state = State::Polling;

        loop {
            state = match state {
                State::Polling if self.run.is_cancelled() => State::Stopped,
                State::Polling => match self.call(self.ledger.load_account(signer.account_id())).await
                {
                    Ok(snapshot) => match sendable(snapshot.balance, self.config.reserve) {
                        Some(amount) => State::Draining { snapshot, amount },
                        None => {
                            failures = 0;
                            if throttle.should_emit(Instant::now(), snapshot.balance) {
                                self.emit(Event::warn(format!(
                                    "Balance too low ({}), still watching",
                                    snapshot.balance.normalize()
                                )));
                            }
                            State::Idle(self.policy.idle_delay + self.policy.jitter.sample())
                        }
                    },
                    Err(e) => self.fail(e, &mut failures),
                },
                State::Draining { snapshot, amount } => {
                    self.drain(signer.as_ref(), &snapshot, amount, &mut failures, &mut throttle)
                        .await
                }
                State::Idle(delay) | State::Backoff(delay) => {
                    self.pause(delay).await;
                    State::Polling
                }
                State::Stopped => break,
            };
        }

        self.emit(Event::info("Stopped"));
        WorkerExit::Stopped
    }

    /// Key derivation is CPU bound (PBKDF2), so it runs on the blocking pool.
    async fn resolve_signer(&self) -> Result<Box<dyn SigningKey>, String> {
        let deriver = self.deriver.clone();
        let credential = self.config.credential.clone();
        match tokio::task::spawn_blocking(move || deriver.derive(&credential)).await {
            Ok(derived) => derived.map_err(|e| e.to_string()),
            Err(e) => Err(format!("key derivation task failed: {e}")),
        }
    }

    async fn drain(
        &self,
        signer: &dyn SigningKey,
        snapshot: &AccountSnapshot,
        amount: Decimal,
        failures: &mut u32,
        throttle: &mut WarnThrottle,
    ) -> State {
        self.emit(Event::success(format!(
            "Balance detected, sending {}",
            format_native(amount)
        )));
        let payment = PaymentRequest {
            destination: self.config.destination.clone(),
            amount,
        };
        match self
            .call(self.ledger.submit_payment(signer, snapshot, &payment))
            .await
        {
            Ok(receipt) => {
                *failures = 0;
                throttle.reset();
                self.emit(Event::success(format!(
                    "Transaction sent, hash {}",
                    receipt.hash
                )));
                if let Some(link) = self.policy.explorer_link(&receipt.hash) {
                    self.emit(Event::info(format!("Explorer: {link}")));
                }
                State::Idle(self.policy.jitter.sample())
            }
            Err(e) => self.fail(e, failures),
        }
    }

    fn fail(&self, error: LedgerError, failures: &mut u32) -> State {
        *failures = failures.saturating_add(1);
        let delay = self.policy.backoff.delay_for(&error, *failures) + self.policy.jitter.sample();
        debug!(
            worker = %self.config.id,
            class = ?error.class(),
            failures = *failures,
            delay_ms = delay.as_millis() as u64,
            "Ledger call failed, backing off"
        );
        self.emit(Event::error(format!("Error: {error}")));
        State::Backoff(delay)
    }

    /// Apply the optional per-call timeout.
    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        match self.policy.request_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or(Err(LedgerError::Timeout(limit))),
            None => request.await,
        }
    }

    /// Sleep for `delay`, returning early on stop.
    async fn pause(&self, delay: Duration) {
        tokio::select! {
            _ = self.run.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }

    fn emit(&self, event: Event) {
        self.sink.publish(event.from_worker(self.config.id));
    }
}
