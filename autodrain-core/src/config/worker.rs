use autodrain_sdk::objects::ValidatedStart;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::events::WorkerId;
use crate::keys::{AccountId, Credential, StrkeyError};

/// Everything a single drain worker needs. Immutable once built.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub id: WorkerId,
    pub credential: Credential,
    pub destination: AccountId,
    pub reserve: Decimal,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no account credentials given")]
    NoAccounts,

    #[error("reserve must not be negative, got {0}")]
    NegativeReserve(Decimal),

    #[error("invalid destination address: {0}")]
    Destination(#[from] StrkeyError),
}

/// A validated request to start one worker per credential.
#[derive(Debug, Clone)]
pub struct DrainPlan {
    pub credentials: Vec<Credential>,
    pub destination: AccountId,
    pub reserve: Decimal,
}

impl DrainPlan {
    pub fn new(
        credentials: Vec<Credential>,
        destination: AccountId,
        reserve: Decimal,
    ) -> Result<Self, PlanError> {
        if credentials.is_empty() {
            return Err(PlanError::NoAccounts);
        }
        if reserve.is_sign_negative() && !reserve.is_zero() {
            return Err(PlanError::NegativeReserve(reserve));
        }
        Ok(Self {
            credentials,
            destination,
            reserve,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.credentials.len()
    }

    /// One config per credential, numbered from 1 in input order.
    pub fn into_worker_configs(self) -> Vec<WorkerConfig> {
        let Self {
            credentials,
            destination,
            reserve,
        } = self;
        credentials
            .into_iter()
            .enumerate()
            .map(|(i, credential)| WorkerConfig {
                id: WorkerId(i + 1),
                credential,
                destination: destination.clone(),
                reserve,
            })
            .collect()
    }
}

impl TryFrom<ValidatedStart> for DrainPlan {
    type Error = PlanError;

    fn try_from(start: ValidatedStart) -> Result<Self, Self::Error> {
        let destination: AccountId = start.destination.parse()?;
        let credentials = start.accounts.into_iter().map(Credential::new).collect();
        Self::new(credentials, destination, start.reserve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEST: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";

    fn start(accounts: &[&str], destination: &str) -> ValidatedStart {
        ValidatedStart {
            accounts: accounts.iter().map(|s| s.to_string()).collect(),
            destination: destination.to_string(),
            reserve: Decimal::new(101, 2),
        }
    }

    #[test]
    fn test_plan_from_validated_start() {
        let plan = DrainPlan::try_from(start(&["a", "b", "c"], DEST)).unwrap();
        assert_eq!(plan.worker_count(), 3);
        let configs = plan.into_worker_configs();
        let ids: Vec<usize> = configs.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(configs.iter().all(|c| c.destination.as_str() == DEST));
        assert_eq!(configs[1].credential.expose(), "b");
    }

    #[test]
    fn test_plan_rejects_bad_destination() {
        assert!(matches!(
            DrainPlan::try_from(start(&["a"], "GNOTANADDRESS")),
            Err(PlanError::Destination(_))
        ));
    }

    #[test]
    fn test_plan_rejects_negative_reserve() {
        let destination: AccountId = DEST.parse().unwrap();
        let result = DrainPlan::new(vec![Credential::new("a")], destination, Decimal::NEGATIVE_ONE);
        assert!(matches!(result, Err(PlanError::NegativeReserve(_))));
    }
}
