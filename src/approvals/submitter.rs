use std::collections::HashMap;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::Serialize;
use thiserror::Error;

use crate::approvals::{
    config::RevokeSettings,
    errors::FailedCode,
    models::{Account, Transaction},
    serde_primitives::biguint_string,
};

/// Estimated or paid gas of one transaction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GasCost {
    pub gas_limit: u64,
    /// Gas price in wei.
    #[serde(with = "biguint_string")]
    pub gas_price: BigUint,
    /// Cost in native token units.
    pub native_amount: f64,
    pub usd_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmitReceipt {
    pub tx_hash: String,
    pub gas_cost: Option<GasCost>,
}

/// Progress reported by a submitter while a transaction goes out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitEvent {
    Built,
    Signed,
    /// Fees are paid by a sponsoring gas account.
    UsingGasAccount,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    pub ignore_gas_check: bool,
    /// Route fees through a gas account when the account is eligible.
    pub use_gas_account: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error("Insufficient balance to pay gas")]
    GasNotEnough { gas_cost: Option<GasCost> },
    #[error("Gas cost ${:.2} exceeds the ${:.2} limit", .gas_cost.usd_value, .limit_usd)]
    GasTooHigh { gas_cost: GasCost, limit_usd: f64 },
    #[error("Simulation failed: {0}")]
    SimulationFailed(String),
    #[error("Submission failed: {0}")]
    SubmitTxFailed(String),
    #[error("Cancelled by user")]
    UserCancelled,
    #[error("{0}")]
    Other(String),
}

impl SubmitError {
    pub fn failed_code(&self) -> FailedCode {
        match self {
            SubmitError::GasNotEnough { .. } => FailedCode::GasNotEnough,
            SubmitError::GasTooHigh { .. } => FailedCode::GasTooHigh,
            SubmitError::SimulationFailed(_) => FailedCode::SimulationFailed,
            SubmitError::SubmitTxFailed(_) | SubmitError::UserCancelled => {
                FailedCode::SubmitTxFailed
            }
            SubmitError::Other(_) => FailedCode::DefaultFailed,
        }
    }

    /// Estimated gas cost, when the failure happened after estimation.
    pub fn gas_cost(&self) -> Option<&GasCost> {
        match self {
            SubmitError::GasNotEnough { gas_cost } => gas_cost.as_ref(),
            SubmitError::GasTooHigh { gas_cost, .. } => Some(gas_cost),
            _ => None,
        }
    }
}

/// Signs and broadcasts transactions for an account.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(
        &self,
        tx: &Transaction,
        account: &Account,
        options: SubmitOptions,
        on_event: &(dyn Fn(SubmitEvent) + Send + Sync),
    ) -> Result<SubmitReceipt, SubmitError>;
}

/// Holds back transactions whose gas cost is unusually high for their chain.
#[derive(Clone, Debug, PartialEq)]
pub struct GasGuard {
    limits_usd: HashMap<String, f64>,
    default_limit_usd: f64,
}

impl Default for GasGuard {
    fn default() -> Self {
        Self::from_settings(&RevokeSettings::default())
    }
}

impl GasGuard {
    pub fn from_settings(settings: &RevokeSettings) -> Self {
        Self {
            limits_usd: settings.gas_limit_usd.clone(),
            default_limit_usd: settings.default_gas_limit_usd,
        }
    }

    pub fn limit_usd(&self, chain: &str) -> f64 {
        self.limits_usd
            .get(chain)
            .copied()
            .unwrap_or(self.default_limit_usd)
    }

    pub fn check(
        &self,
        chain: &str,
        gas_cost: &GasCost,
        ignore_gas_check: bool,
    ) -> Result<(), SubmitError> {
        let limit_usd = self.limit_usd(chain);
        if !ignore_gas_check && gas_cost.usd_value > limit_usd {
            return Err(SubmitError::GasTooHigh { gas_cost: gas_cost.clone(), limit_usd });
        }
        Ok(())
    }
}
