use std::{collections::HashMap, env, sync::Arc};

use alloy::{
    primitives::Address,
    providers::{Provider, ProviderBuilder, RootProvider},
    transports::BoxTransport,
};
use async_trait::async_trait;
use dotenv::dotenv;
use tokio::sync::Mutex;

use crate::approvals::{
    chains::{Chain, ChainRegistry},
    errors::ApprovalError,
    evm::{constants::RPC_URL_ENV_PREFIX, eip7702::ChainStateReader},
};

pub async fn get_client(rpc_url: &str) -> Result<Arc<RootProvider<BoxTransport>>, ApprovalError> {
    let client = ProviderBuilder::new()
        .on_builtin(rpc_url)
        .await
        .map_err(|e| {
            ApprovalError::FatalError(format!("Failed to connect to RPC {rpc_url}: {e}"))
        })?;
    Ok(Arc::new(client))
}

/// Collects `RPC_URL_<ENUM>` variables (after loading `.env`) for every chain in the registry.
pub fn rpc_urls_from_env(chains: &ChainRegistry) -> HashMap<String, String> {
    dotenv().ok();
    chains
        .chains()
        .iter()
        .filter_map(|chain| {
            env::var(format!("{RPC_URL_ENV_PREFIX}{}", chain.enum_name))
                .ok()
                .map(|url| (chain.enum_name.clone(), url))
        })
        .collect()
}

/// Looks up the RPC url of a chain, keyed by chain enum name.
pub fn rpc_url_for<'a>(
    rpc_urls: &'a HashMap<String, String>,
    chain: &Chain,
) -> Result<&'a str, ApprovalError> {
    rpc_urls
        .get(&chain.enum_name)
        .map(String::as_str)
        .ok_or_else(|| {
            ApprovalError::FatalError(format!(
                "Missing {RPC_URL_ENV_PREFIX}{} in environment",
                chain.enum_name
            ))
        })
}

/// Reads account state over JSON-RPC, one lazily connected provider per chain.
pub struct RpcChainReader {
    rpc_urls: HashMap<String, String>,
    clients: Mutex<HashMap<String, Arc<RootProvider<BoxTransport>>>>,
}

impl RpcChainReader {
    pub fn new(rpc_urls: HashMap<String, String>) -> Self {
        Self { rpc_urls, clients: Mutex::new(HashMap::new()) }
    }

    pub fn from_env(chains: &ChainRegistry) -> Self {
        Self::new(rpc_urls_from_env(chains))
    }

    async fn client(&self, chain: &Chain) -> Result<Arc<RootProvider<BoxTransport>>, ApprovalError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&chain.enum_name) {
            return Ok(client.clone());
        }
        let client = get_client(rpc_url_for(&self.rpc_urls, chain)?).await?;
        clients.insert(chain.enum_name.clone(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl ChainStateReader for RpcChainReader {
    async fn get_code(&self, chain: &Chain, address: Address) -> Result<Vec<u8>, ApprovalError> {
        let client = self.client(chain).await?;
        let code = client
            .get_code_at(address)
            .await
            .map_err(|err| {
                ApprovalError::RecoverableError(format!(
                    "eth_getCode on {} failed with error: {:?}",
                    chain.enum_name, err
                ))
            })?;
        Ok(code.to_vec())
    }

    async fn get_transaction_count(
        &self,
        chain: &Chain,
        address: Address,
    ) -> Result<u64, ApprovalError> {
        let client = self.client(chain).await?;
        client
            .get_transaction_count(address)
            .await
            .map_err(|err| {
                ApprovalError::RecoverableError(format!(
                    "eth_getTransactionCount on {} failed with error: {:?}",
                    chain.enum_name, err
                ))
            })
    }
}
