use serde::{Deserialize, Serialize};

use crate::approvals::models::{ContractApproval, RiskLevel, Spender};

/// Thresholds turning client-side exposure figures into risk weights.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RiskThresholds {
    /// Trust value (USD) below which a spender is dangerous.
    pub spend_danger_usd: f64,
    /// Trust value (USD) below which a spender deserves a warning.
    pub spend_warning_usd: f64,
    /// Approving user count below which a spender is dangerous.
    pub approval_danger_count: u64,
    /// Approving user count below which a spender deserves a warning.
    pub approval_warning_count: u64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            spend_danger_usd: 1_000.0,
            spend_warning_usd: 10_000.0,
            approval_danger_count: 10,
            approval_warning_count: 100,
        }
    }
}

/// Client-side figures the risk evaluation is derived from.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RiskAboutValues {
    /// Spend-at-risk: USD value approved to the spender across all users.
    pub risk_spend_usd_value: f64,
    pub approve_user_count: u64,
    pub revoke_user_count: u64,
    pub last_approve_at: Option<i64>,
}

impl RiskAboutValues {
    pub fn from_spender(spender: &Spender) -> Self {
        Self {
            risk_spend_usd_value: spender.exposure_usd,
            approve_user_count: spender.approve_user_count,
            revoke_user_count: spender.revoke_user_count,
            last_approve_at: spender.last_approve_at,
        }
    }
}

/// Server score plus the client score components of one aggregate.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RiskEvaluation {
    pub server_risk_score: u32,
    pub client_spend_score: u32,
    pub client_approval_score: u32,
    pub client_total_risk_score: u32,
    pub client_max_risk_score: u32,
}

impl RiskEvaluation {
    pub fn evaluate(
        server_level: RiskLevel,
        values: &RiskAboutValues,
        thresholds: &RiskThresholds,
    ) -> Self {
        let client_spend_score = if values.risk_spend_usd_value < thresholds.spend_danger_usd {
            RiskLevel::Danger
        } else if values.risk_spend_usd_value < thresholds.spend_warning_usd {
            RiskLevel::Warning
        } else {
            RiskLevel::Safe
        }
        .score();
        let client_approval_score = if values.approve_user_count < thresholds.approval_danger_count
        {
            RiskLevel::Danger
        } else if values.approve_user_count < thresholds.approval_warning_count {
            RiskLevel::Warning
        } else {
            RiskLevel::Safe
        }
        .score();

        Self {
            server_risk_score: server_level.score(),
            client_spend_score,
            client_approval_score,
            client_total_risk_score: client_spend_score + client_approval_score,
            client_max_risk_score: client_spend_score.max(client_approval_score),
        }
    }
}

/// Danger/warning flags of a single client score component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComponentRisk {
    pub is_danger: bool,
    pub is_warning: bool,
}

impl ComponentRisk {
    fn from_score(score: u32) -> Self {
        let is_danger = score >= RiskLevel::Danger.score();
        let is_warning = !is_danger && score >= RiskLevel::Warning.score();
        Self { is_danger, is_warning }
    }

    pub fn is_risky(&self) -> bool {
        self.is_danger || self.is_warning
    }
}

/// Re-evaluation of a contract aggregate used for bucketing and table ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractRisk {
    pub server_level: RiskLevel,
    /// `None` when the client max score is not one of the level weights.
    pub client_level: Option<RiskLevel>,
    /// Server score dominates: `client_total + server * 100`.
    pub total_risk_score: u64,
    pub trust_value: ComponentRisk,
    pub revoke_trends: ComponentRisk,
}

pub fn re_evaluate_contract_risk(contract: &ContractApproval) -> ContractRisk {
    let eval = &contract.risk_evaluation;
    ContractRisk {
        server_level: contract.risk_level,
        client_level: RiskLevel::from_score(eval.client_max_risk_score),
        total_risk_score: eval.client_total_risk_score as u64 + eval.server_risk_score as u64 * 100,
        trust_value: ComponentRisk::from_score(eval.client_spend_score),
        revoke_trends: ComponentRisk::from_score(eval.client_approval_score),
    }
}

/// Badge-level summary: the worse of the server and client scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalRiskInfo {
    pub is_server_risk: bool,
    pub is_danger: bool,
    pub is_warning: bool,
}

pub fn final_risk_info(contract: &ContractApproval) -> FinalRiskInfo {
    let eval = &contract.risk_evaluation;
    let final_max = eval.client_max_risk_score.max(eval.server_risk_score);
    let is_danger = final_max >= RiskLevel::Danger.score();
    FinalRiskInfo {
        is_server_risk: eval.server_risk_score >= RiskLevel::Warning.score(),
        is_danger,
        is_warning: !is_danger && final_max >= RiskLevel::Warning.score(),
    }
}

pub fn is_risky_contract(contract: &ContractApproval) -> bool {
    matches!(contract.risk_level, RiskLevel::Danger | RiskLevel::Warning)
}
