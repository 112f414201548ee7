use std::{collections::HashMap, fs};

use serde::{Deserialize, Serialize};

use crate::approvals::{constants::DEFAULT_CHAINS_JSON, errors::ApprovalError};

/// Metadata of one supported chain.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Chain {
    /// Upper-case short name, e.g. `ETH`, `ARBITRUM`.
    #[serde(rename = "enum")]
    pub enum_name: String,
    /// Id the approvals API uses for the chain, e.g. `eth`, `arb`.
    pub server_id: String,
    /// EVM chain id.
    pub id: u64,
    pub name: String,
    pub native_token_symbol: String,
}

/// Lookup table of supported chains by server id, enum name or numeric id.
#[derive(Clone, Debug)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
    by_server_id: HashMap<String, usize>,
}

impl ChainRegistry {
    /// Loads the chain list from the file at the given path, or from the bundled list when no
    /// path is given.
    pub fn new(chains_file_path: Option<String>) -> Result<Self, ApprovalError> {
        let config_str = if let Some(ref path) = chains_file_path {
            fs::read_to_string(path).map_err(|e| {
                ApprovalError::FatalError(format!(
                    "Error reading chains file from {:?}: {}",
                    chains_file_path, e
                ))
            })?
        } else {
            DEFAULT_CHAINS_JSON.to_string()
        };
        let chains: Vec<Chain> = serde_json::from_str(&config_str)?;
        Self::from_chains(chains)
    }

    pub fn from_chains(chains: Vec<Chain>) -> Result<Self, ApprovalError> {
        let mut by_server_id = HashMap::new();
        for (idx, chain) in chains.iter().enumerate() {
            if by_server_id
                .insert(chain.server_id.clone(), idx)
                .is_some()
            {
                return Err(ApprovalError::FatalError(format!(
                    "Duplicated chain server id {}",
                    chain.server_id
                )));
            }
        }
        Ok(Self { chains, by_server_id })
    }

    pub fn find_by_server_id(&self, server_id: &str) -> Option<&Chain> {
        self.by_server_id
            .get(server_id)
            .map(|idx| &self.chains[*idx])
    }

    pub fn find_by_enum(&self, enum_name: &str) -> Option<&Chain> {
        self.chains
            .iter()
            .find(|c| c.enum_name.eq_ignore_ascii_case(enum_name))
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// Like `find_by_server_id`, but an unknown chain is an input error.
    pub fn get(&self, server_id: &str) -> Result<&Chain, ApprovalError> {
        self.find_by_server_id(server_id)
            .ok_or_else(|| ApprovalError::InvalidInput(format!("Unsupported chain {server_id}")))
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }
}
