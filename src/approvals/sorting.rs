use std::{cmp::Ordering, collections::HashMap};

use serde::Serialize;

use crate::approvals::{
    models::{ApprovalAggregate, AssetGrant, ContractApproval, RiskLevel},
    risk::re_evaluate_contract_risk,
};

/// Orders the grants of a token/NFT aggregate: riskiest first, then by approved value, id and
/// protocol name, all descending.
pub fn compare_asset_grants(a: &AssetGrant, b: &AssetGrant) -> Ordering {
    b.spender
        .risk_level
        .cmp(&a.spender.risk_level)
        .then_with(|| b.spender.value.total_cmp(&a.spender.value))
        .then_with(|| b.id().cmp(a.id()))
        .then_with(|| {
            b.spender
                .protocol_name()
                .cmp(a.spender.protocol_name())
        })
}

pub fn sort_grants(grants: &mut [AssetGrant]) {
    grants.sort_by(compare_asset_grants);
}

/// Priority buckets of the contract view, riskiest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractRiskBucket {
    /// Server danger and client danger.
    Danger2,
    /// Server danger and client warning.
    Danger1,
    /// Server or client danger.
    Warning2,
    /// Server or client warning.
    Warning1,
    Safe,
}

impl ContractRiskBucket {
    pub fn classify(contract: &ContractApproval) -> Self {
        let risk = re_evaluate_contract_risk(contract);
        let server = risk.server_level;
        let client = risk.client_level;
        match (server, client) {
            (RiskLevel::Danger, Some(RiskLevel::Danger)) => ContractRiskBucket::Danger2,
            (RiskLevel::Danger, Some(RiskLevel::Warning)) => ContractRiskBucket::Danger1,
            (RiskLevel::Danger, _) | (_, Some(RiskLevel::Danger)) => ContractRiskBucket::Warning2,
            (RiskLevel::Warning, _) | (_, Some(RiskLevel::Warning)) => {
                ContractRiskBucket::Warning1
            }
            _ => ContractRiskBucket::Safe,
        }
    }
}

/// Table order within a bucket: total risk score desc, spend-at-risk asc, grant count desc.
pub fn compare_contracts_as_table(a: &ContractApproval, b: &ContractApproval) -> Ordering {
    let a_score = re_evaluate_contract_risk(a).total_risk_score;
    let b_score = re_evaluate_contract_risk(b).total_risk_score;
    b_score
        .cmp(&a_score)
        .then_with(|| {
            a.risk_about_values
                .risk_spend_usd_value
                .total_cmp(&b.risk_about_values.risk_spend_usd_value)
        })
        .then_with(|| b.list.len().cmp(&a.list.len()))
}

/// Safe-bucket layout: group by chain, groups by member count desc, members by grant count
/// desc, then the whole sequence reversed.
fn arrange_safe_bucket<G>(safe: Vec<&ApprovalAggregate<G>>) -> Vec<&ApprovalAggregate<G>> {
    let mut group_of: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&ApprovalAggregate<G>>> = Vec::new();
    for approval in safe {
        let idx = *group_of
            .entry(approval.chain.as_str())
            .or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
        groups[idx].push(approval);
    }

    groups.sort_by(|a, b| b.len().cmp(&a.len()));
    let mut arranged: Vec<&ApprovalAggregate<G>> = groups
        .into_iter()
        .flat_map(|mut members| {
            members.sort_by(|a, b| b.list.len().cmp(&a.list.len()));
            members
        })
        .collect();
    arranged.reverse();
    arranged
}

/// Contract view order: risk buckets in priority order, each table-sorted.
pub fn sort_contract_approvals<'a>(
    approvals: impl IntoIterator<Item = &'a ContractApproval>,
) -> Vec<&'a ContractApproval> {
    let mut buckets: [Vec<&ContractApproval>; 4] = Default::default();
    let mut safe = Vec::new();
    for approval in approvals {
        match ContractRiskBucket::classify(approval) {
            ContractRiskBucket::Danger2 => buckets[0].push(approval),
            ContractRiskBucket::Danger1 => buckets[1].push(approval),
            ContractRiskBucket::Warning2 => buckets[2].push(approval),
            ContractRiskBucket::Warning1 => buckets[3].push(approval),
            ContractRiskBucket::Safe => safe.push(approval),
        }
    }

    let mut sorted = Vec::new();
    for mut bucket in buckets {
        bucket.sort_by(|a, b| compare_contracts_as_table(a, b));
        sorted.extend(bucket);
    }
    let mut safe = arrange_safe_bucket(safe);
    safe.sort_by(|a, b| compare_contracts_as_table(a, b));
    sorted.extend(safe);
    sorted
}

#[derive(Debug, Serialize)]
pub struct SortedAssetApprovals<'a> {
    pub danger: Vec<&'a ApprovalAggregate<AssetGrant>>,
    pub warning: Vec<&'a ApprovalAggregate<AssetGrant>>,
    pub safe: Vec<&'a ApprovalAggregate<AssetGrant>>,
    /// `danger`, then `warning`, then `safe`.
    pub final_list: Vec<&'a ApprovalAggregate<AssetGrant>>,
}

/// Token/NFT view order: danger, warning, then the safe bucket layout.
pub fn sort_asset_approvals<'a>(
    approvals: impl IntoIterator<Item = &'a ApprovalAggregate<AssetGrant>>,
) -> SortedAssetApprovals<'a> {
    let mut danger = Vec::new();
    let mut warning = Vec::new();
    let mut safe = Vec::new();
    for approval in approvals {
        match approval.risk_level {
            RiskLevel::Danger => danger.push(approval),
            RiskLevel::Warning => warning.push(approval),
            RiskLevel::Safe => safe.push(approval),
        }
    }
    let safe = arrange_safe_bucket(safe);
    let final_list = danger
        .iter()
        .chain(warning.iter())
        .chain(safe.iter())
        .copied()
        .collect();
    SortedAssetApprovals { danger, warning, safe, final_list }
}

/// Case-insensitive search over id, risk alert, name and chain. A blank keyword keeps
/// everything.
pub fn filter_by_keyword<'a, G>(
    approvals: &[&'a ApprovalAggregate<G>],
    keyword: &str,
) -> Vec<&'a ApprovalAggregate<G>> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return approvals.to_vec();
    }
    approvals
        .iter()
        .filter(|a| {
            [
                a.id.as_str(),
                a.risk_alert.as_deref().unwrap_or(""),
                a.name.as_str(),
                a.chain.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&keyword))
        })
        .copied()
        .collect()
}

/// Why a list renders empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyStatus {
    /// The address has no approvals of this kind.
    None,
    /// Approvals exist but the keyword matches none.
    NoMatched,
}

pub fn empty_status(total: usize, displayed: usize) -> Option<EmptyStatus> {
    if total == 0 {
        Some(EmptyStatus::None)
    } else if displayed == 0 {
        Some(EmptyStatus::NoMatched)
    } else {
        None
    }
}
