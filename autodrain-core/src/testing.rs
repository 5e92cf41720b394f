//! In-memory collaborators for driving workers and the orchestrator in tests.

use async_trait::async_trait;
use ring::digest;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::{BackoffPolicy, WorkerPolicy};
use crate::events::{Event, EventSubscription};
use crate::keys::{AccountId, Credential, Ed25519Key, KeyDeriver, KeyError, SigningKey};
use crate::ledger::{AccountSnapshot, Ledger, LedgerError, PaymentReceipt, PaymentRequest};
use crate::utils::jitter::JitterRange;

/// Credentials starting with this prefix fail to derive.
pub const BAD_CREDENTIAL: &str = "bad";

pub struct FakeDeriver;

impl FakeDeriver {
    fn seed(credential: &str) -> [u8; 32] {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(digest::digest(&digest::SHA256, credential.as_bytes()).as_ref());
        seed
    }

    pub fn account_for(credential: &str) -> AccountId {
        Ed25519Key::from_seed(&Self::seed(credential))
            .unwrap()
            .account_id()
            .clone()
    }
}

impl KeyDeriver for FakeDeriver {
    fn derive(&self, credential: &Credential) -> Result<Box<dyn SigningKey>, KeyError> {
        if credential.expose().starts_with(BAD_CREDENTIAL) {
            return Err(KeyError::InvalidMnemonic("unknown word".to_string()));
        }
        Ok(Box::new(Ed25519Key::from_seed(&Self::seed(
            credential.expose(),
        ))?))
    }
}

#[derive(Default)]
pub struct FakeLedger {
    balances: Mutex<HashMap<AccountId, Decimal>>,
    load_failures: Mutex<VecDeque<LedgerError>>,
    submit_failures: Mutex<VecDeque<LedgerError>>,
    payments: Mutex<Vec<(AccountId, PaymentRequest)>>,
    polls: Mutex<HashMap<AccountId, usize>>,
    total_polls: AtomicUsize,
    load_delay: Option<Duration>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn set_balance(&self, account: &AccountId, balance: Decimal) {
        self.balances
            .lock()
            .unwrap()
            .insert(account.clone(), balance);
    }

    pub fn balance(&self, account: &AccountId) -> Option<Decimal> {
        self.balances.lock().unwrap().get(account).copied()
    }

    pub fn fail_next_load(&self, error: LedgerError) {
        self.load_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_submit(&self, error: LedgerError) {
        self.submit_failures.lock().unwrap().push_back(error);
    }

    pub fn payments(&self) -> Vec<(AccountId, PaymentRequest)> {
        self.payments.lock().unwrap().clone()
    }

    pub fn polls_of(&self, account: &AccountId) -> usize {
        self.polls.lock().unwrap().get(account).copied().unwrap_or(0)
    }

    pub fn total_polls(&self) -> usize {
        self.total_polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn load_account(&self, account: &AccountId) -> Result<AccountSnapshot, LedgerError> {
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        self.total_polls.fetch_add(1, Ordering::SeqCst);
        *self
            .polls
            .lock()
            .unwrap()
            .entry(account.clone())
            .or_default() += 1;
        if let Some(err) = self.load_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let balance = self
            .balance(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
        Ok(AccountSnapshot {
            account: account.clone(),
            balance,
            sequence: 1,
        })
    }

    async fn submit_payment(
        &self,
        signer: &dyn SigningKey,
        source: &AccountSnapshot,
        payment: &PaymentRequest,
    ) -> Result<PaymentReceipt, LedgerError> {
        if let Some(err) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let account = signer.account_id().clone();
        assert_eq!(account, source.account);
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(account.clone()).or_default();
        *balance -= payment.amount;
        let mut payments = self.payments.lock().unwrap();
        payments.push((account, payment.clone()));
        Ok(PaymentReceipt {
            hash: format!("hash-{}", payments.len()),
            ledger: Some(1),
        })
    }
}

/// Short delays so tests run many iterations quickly.
pub fn fast_policy() -> WorkerPolicy {
    WorkerPolicy {
        idle_delay: Duration::from_millis(5),
        jitter: JitterRange::from_millis(1, 2),
        warn_interval: Duration::from_secs(5),
        backoff: BackoffPolicy {
            base: Duration::from_millis(5),
            max: Duration::from_millis(20),
        },
        request_timeout: None,
        explorer_tx_url: None,
    }
}

/// Poll `condition` until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    condition()
}

/// Everything the subscription yields until it stays quiet for `quiet`.
pub async fn drain_events(sub: &mut EventSubscription, quiet: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(quiet, sub.recv()).await {
        events.push(event);
    }
    events
}
