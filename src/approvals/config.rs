use std::{collections::HashMap, env, fs};

use dotenv::dotenv;
use serde::{Deserialize, Serialize};

use crate::approvals::{
    constants::{
        DEFAULT_AGGREGATE_CONCURRENCY, DEFAULT_DELEGATION_CHECK_CONCURRENCY,
        DEFAULT_GAS_LIMIT_USD, DEFAULT_SETTINGS_JSON, ETH_GAS_LIMIT_USD,
    },
    errors::ApprovalError,
    risk::RiskThresholds,
};

/// Tunables of the revoke engine.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RevokeSettings {
    #[serde(default = "default_aggregate_concurrency")]
    pub aggregate_concurrency: usize,
    #[serde(default = "default_delegation_check_concurrency")]
    pub delegation_check_concurrency: usize,
    /// Per-chain gas limits in USD, keyed by chain server id.
    #[serde(default)]
    pub gas_limit_usd: HashMap<String, f64>,
    #[serde(default = "default_gas_limit_usd")]
    pub default_gas_limit_usd: f64,
    #[serde(default)]
    pub risk_thresholds: RiskThresholds,
}

fn default_aggregate_concurrency() -> usize {
    DEFAULT_AGGREGATE_CONCURRENCY
}

fn default_delegation_check_concurrency() -> usize {
    DEFAULT_DELEGATION_CHECK_CONCURRENCY
}

fn default_gas_limit_usd() -> f64 {
    DEFAULT_GAS_LIMIT_USD
}

impl Default for RevokeSettings {
    fn default() -> Self {
        Self {
            aggregate_concurrency: DEFAULT_AGGREGATE_CONCURRENCY,
            delegation_check_concurrency: DEFAULT_DELEGATION_CHECK_CONCURRENCY,
            gas_limit_usd: HashMap::from([("eth".to_string(), ETH_GAS_LIMIT_USD)]),
            default_gas_limit_usd: DEFAULT_GAS_LIMIT_USD,
            risk_thresholds: RiskThresholds::default(),
        }
    }
}

impl RevokeSettings {
    /// Reads the settings file at the given path (or the bundled one), then applies
    /// `REVOKE_*` environment overrides.
    pub fn load(settings_file_path: Option<String>) -> Result<Self, ApprovalError> {
        let config_str = if let Some(ref path) = settings_file_path {
            fs::read_to_string(path).map_err(|e| {
                ApprovalError::FatalError(format!(
                    "Error reading settings file from {:?}: {}",
                    settings_file_path, e
                ))
            })?
        } else {
            DEFAULT_SETTINGS_JSON.to_string()
        };
        let mut settings: RevokeSettings = serde_json::from_str(&config_str)?;
        dotenv().ok();
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parse("REVOKE_AGGREGATE_CONCURRENCY") {
            self.aggregate_concurrency = v;
        }
        if let Some(v) = env_parse("REVOKE_DELEGATION_CHECK_CONCURRENCY") {
            self.delegation_check_concurrency = v;
        }
        if let Some(v) = env_parse("REVOKE_DEFAULT_GAS_LIMIT_USD") {
            self.default_gas_limit_usd = v;
        }
    }

    fn validate(&self) -> Result<(), ApprovalError> {
        if self.aggregate_concurrency == 0 || self.delegation_check_concurrency == 0 {
            return Err(ApprovalError::FatalError(
                "Concurrency settings must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Gas cost limit in USD for the given chain server id.
    pub fn gas_limit_for(&self, chain: &str) -> f64 {
        self.gas_limit_usd
            .get(chain)
            .copied()
            .unwrap_or(self.default_gas_limit_usd)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
}
