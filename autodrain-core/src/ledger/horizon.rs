//! Horizon REST implementation of [`Ledger`].

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};
use url::Url;

use super::xdr::{self, PaymentTransaction};
use super::{
    AccountSnapshot, Ledger, LedgerError, PaymentReceipt, PaymentRequest, TxRejection,
};
use crate::keys::{AccountId, SigningKey};
use crate::utils::amount::to_stroops;

pub const DEFAULT_HORIZON_URL: &str = "https://apimainnet.vercel.app";
pub const PI_NETWORK_PASSPHRASE: &str = "Pi Network";
/// Base fee used when `/fee_stats` cannot be read.
pub const FALLBACK_BASE_FEE: u32 = 100;

#[derive(Debug, Clone)]
pub struct HorizonConfig {
    pub base_url: Url,
    pub network_passphrase: String,
    /// How long a submitted transaction stays valid.
    pub tx_validity: Duration,
    pub fallback_base_fee: u32,
    /// Whole-request timeout on the HTTP client.
    pub http_timeout: Duration,
}

impl HorizonConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            network_passphrase: PI_NETWORK_PASSPHRASE.to_string(),
            tx_validity: Duration::from_secs(30),
            fallback_base_fee: FALLBACK_BASE_FEE,
            http_timeout: Duration::from_secs(30),
        }
    }
}

pub struct HorizonLedger {
    base: String,
    network_id: [u8; 32],
    tx_validity: Duration,
    fallback_base_fee: u32,
    http_client: reqwest::Client,
}

impl HorizonLedger {
    pub fn new(config: HorizonConfig) -> Self {
        Self {
            base: config.base_url.as_str().trim_end_matches('/').to_string(),
            network_id: xdr::network_id(&config.network_passphrase),
            tx_validity: config.tx_validity,
            fallback_base_fee: config.fallback_base_fee,
            http_client: reqwest::Client::builder()
                .timeout(config.http_timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Last ledger base fee, falling back to the configured value.
    async fn base_fee(&self) -> u32 {
        #[derive(Deserialize)]
        struct FeeStats {
            last_ledger_base_fee: String,
        }

        let fetched = async {
            let response = self
                .http_client
                .get(format!("{}/fee_stats", self.base))
                .send()
                .await?
                .error_for_status()?;
            let stats: FeeStats = response.json().await?;
            stats
                .last_ledger_base_fee
                .parse::<u32>()
                .map_err(|e| LedgerError::Malformed(format!("invalid base fee: {e}")))
        }
        .await;

        match fetched {
            Ok(fee) => fee,
            Err(e) => {
                warn!(error = %e, fallback = self.fallback_base_fee, "Failed to fetch base fee");
                self.fallback_base_fee
            }
        }
    }
}

#[async_trait]
impl Ledger for HorizonLedger {
    async fn load_account(&self, account: &AccountId) -> Result<AccountSnapshot, LedgerError> {
        let response = self
            .http_client
            .get(format!("{}/accounts/{}", self.base, account))
            .send()
            .await?;
        let status = response.status();
        if let Some(err) = status_error(status, retry_after(&response)) {
            return Err(match status {
                StatusCode::NOT_FOUND => LedgerError::AccountNotFound(account.clone()),
                _ => err,
            });
        }
        let body = response.text().await?;
        parse_account(account, &body)
    }

    async fn submit_payment(
        &self,
        signer: &dyn SigningKey,
        source: &AccountSnapshot,
        payment: &PaymentRequest,
    ) -> Result<PaymentReceipt, LedgerError> {
        let amount = to_stroops(payment.amount)
            .filter(|stroops| *stroops > 0)
            .ok_or_else(|| LedgerError::Malformed(format!("invalid amount {}", payment.amount)))?;
        let sequence = source
            .sequence
            .checked_add(1)
            .ok_or_else(|| LedgerError::Malformed("sequence overflow".to_string()))?;
        let now = u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or(0);

        let tx = PaymentTransaction {
            source: *signer.account_id().public_key(),
            fee: self.base_fee().await,
            sequence,
            min_time: 0,
            max_time: now.saturating_add(self.tx_validity.as_secs()),
            destination: *payment.destination.public_key(),
            amount,
        };
        let signed = xdr::signed_envelope(&tx, &self.network_id, signer);
        debug!(hash = %signed.hash, sequence, fee = tx.fee, "Submitting transaction");

        let response = self
            .http_client
            .post(format!("{}/transactions", self.base))
            .form(&[("tx", signed.envelope_xdr.as_str())])
            .send()
            .await?;
        let status = response.status();
        let retry = retry_after(&response);
        let body = response.text().await?;
        if status.is_success() {
            return parse_receipt(&body);
        }
        Err(submit_error(status, retry, &body))
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Errors that depend only on the status code.
fn status_error(status: StatusCode, retry_after: Option<Duration>) -> Option<LedgerError> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Some(LedgerError::RateLimited { retry_after })
    } else if status.is_server_error() {
        Some(LedgerError::Connectivity(format!("HTTP {status}")))
    } else {
        Some(LedgerError::Malformed(format!("HTTP {status}")))
    }
}

fn parse_account(account: &AccountId, body: &str) -> Result<AccountSnapshot, LedgerError> {
    #[derive(Deserialize)]
    struct Balance {
        balance: String,
        asset_type: String,
    }

    #[derive(Deserialize)]
    struct AccountResponse {
        sequence: String,
        balances: Vec<Balance>,
    }

    let parsed: AccountResponse =
        serde_json::from_str(body).map_err(|e| LedgerError::Malformed(e.to_string()))?;
    let sequence = parsed
        .sequence
        .parse::<i64>()
        .map_err(|e| LedgerError::Malformed(format!("invalid sequence: {e}")))?;
    let native = parsed
        .balances
        .iter()
        .find(|b| b.asset_type == "native")
        .ok_or_else(|| LedgerError::Malformed("no native balance".to_string()))?;
    let balance = Decimal::from_str(&native.balance)
        .map_err(|e| LedgerError::Malformed(format!("invalid balance: {e}")))?;

    Ok(AccountSnapshot {
        account: account.clone(),
        balance,
        sequence,
    })
}

fn parse_receipt(body: &str) -> Result<PaymentReceipt, LedgerError> {
    #[derive(Deserialize)]
    struct SubmitResponse {
        hash: String,
        ledger: Option<u32>,
    }

    let parsed: SubmitResponse =
        serde_json::from_str(body).map_err(|e| LedgerError::Malformed(e.to_string()))?;
    Ok(PaymentReceipt {
        hash: parsed.hash,
        ledger: parsed.ledger,
    })
}

fn submit_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> LedgerError {
    #[derive(Deserialize, Default)]
    struct ResultCodes {
        transaction: Option<String>,
        #[serde(default)]
        operations: Vec<String>,
    }

    #[derive(Deserialize, Default)]
    struct Extras {
        result_codes: Option<ResultCodes>,
    }

    #[derive(Deserialize, Default)]
    struct Problem {
        title: Option<String>,
        extras: Option<Extras>,
    }

    let problem: Problem = serde_json::from_str(body).unwrap_or_default();
    let codes = problem.extras.and_then(|e| e.result_codes);
    match codes {
        Some(ResultCodes {
            transaction: Some(tx),
            operations,
        }) => LedgerError::Rejected {
            rejection: TxRejection::from_result_codes(&tx, &operations),
            operations,
        },
        _ => match problem.title {
            Some(title) if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS => {
                LedgerError::Malformed(title)
            }
            _ => status_error(status, retry_after)
                .unwrap_or_else(|| LedgerError::Malformed(format!("HTTP {status}"))),
        },
    }
}
