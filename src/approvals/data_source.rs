use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::approvals::{
    errors::ApprovalError,
    models::{NftAuthorizedList, TokenApprovalRecord},
};

/// Remote source of the raw approval records of an address.
#[async_trait]
pub trait ApprovalDataSource: Send + Sync {
    /// Server ids of the chains the address has been active on.
    async fn used_chain_list(&self, address: &str) -> Result<Vec<String>, ApprovalError>;

    async fn user_nft_authorized_list(
        &self,
        address: &str,
        chain: &str,
    ) -> Result<NftAuthorizedList, ApprovalError>;

    async fn token_authorized_list(
        &self,
        address: &str,
        chain: &str,
    ) -> Result<Vec<TokenApprovalRecord>, ApprovalError>;
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ChainApprovals {
    #[serde(default)]
    pub nft: NftAuthorizedList,
    #[serde(default)]
    pub tokens: Vec<TokenApprovalRecord>,
}

/// Approval records of one address captured ahead of time, e.g. an API dump.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ApprovalsSnapshot {
    pub address: String,
    #[serde(default)]
    pub used_chains: Vec<String>,
    #[serde(default)]
    pub chains: HashMap<String, ChainApprovals>,
}

impl ApprovalsSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, ApprovalError> {
        let mut snapshot: ApprovalsSnapshot = serde_json::from_str(raw)?;
        if snapshot.used_chains.is_empty() {
            let mut chains: Vec<String> = snapshot.chains.keys().cloned().collect();
            chains.sort();
            snapshot.used_chains = chains;
        }
        Ok(snapshot)
    }

    fn chain(&self, address: &str, chain: &str) -> Result<&ChainApprovals, ApprovalError> {
        if !self.address.eq_ignore_ascii_case(address) {
            return Err(ApprovalError::InvalidInput(format!(
                "Snapshot holds approvals of {}, not {}",
                self.address, address
            )));
        }
        self.chains
            .get(chain)
            .ok_or_else(|| ApprovalError::RecoverableError(format!("No data for chain {chain}")))
    }
}

#[async_trait]
impl ApprovalDataSource for ApprovalsSnapshot {
    async fn used_chain_list(&self, address: &str) -> Result<Vec<String>, ApprovalError> {
        if !self.address.eq_ignore_ascii_case(address) {
            return Ok(Vec::new());
        }
        Ok(self.used_chains.clone())
    }

    async fn user_nft_authorized_list(
        &self,
        address: &str,
        chain: &str,
    ) -> Result<NftAuthorizedList, ApprovalError> {
        Ok(self.chain(address, chain)?.nft.clone())
    }

    async fn token_authorized_list(
        &self,
        address: &str,
        chain: &str,
    ) -> Result<Vec<TokenApprovalRecord>, ApprovalError> {
        Ok(self.chain(address, chain)?.tokens.clone())
    }
}
