use std::{collections::HashMap, env, str::FromStr};

use alloy::{
    network::{EthereumWallet, ReceiptResponse},
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use alloy_primitives::B256;
use async_trait::async_trait;
use dotenv::dotenv;
use num_bigint::BigUint;
use tracing::{debug, info};

use crate::approvals::{
    chains::{Chain, ChainRegistry},
    errors::ApprovalError,
    evm::{
        constants::NATIVE_PRICES_ENV,
        rpc::{rpc_url_for, rpc_urls_from_env},
        utils::{format_address, parse_address, to_transaction_request, u256_to_biguint},
    },
    models::{Account, Transaction},
    submitter::{
        GasCost, GasGuard, SubmitError, SubmitEvent, SubmitOptions, SubmitReceipt,
        TransactionSubmitter,
    },
};

const WEI_PER_NATIVE: f64 = 1e18;

/// Signs with a local private key and broadcasts over JSON-RPC.
///
/// Every submission is simulated first (`eth_estimateGas`), priced in USD from the configured
/// native token prices and checked against the account balance and the [`GasGuard`]. A chain
/// without a known native price is priced at zero and never held back by the guard.
pub struct RpcSubmitter {
    signer: PrivateKeySigner,
    chains: ChainRegistry,
    rpc_urls: HashMap<String, String>,
    gas_guard: GasGuard,
    native_prices_usd: HashMap<String, f64>,
}

impl RpcSubmitter {
    pub fn new(private_key: String, chains: ChainRegistry) -> Result<Self, ApprovalError> {
        let pk = B256::from_str(&private_key).map_err(|_| {
            ApprovalError::FatalError("Failed to convert private key to B256".to_string())
        })?;
        let signer = PrivateKeySigner::from_bytes(&pk).map_err(|_| {
            ApprovalError::FatalError("Failed to create signer from private key".to_string())
        })?;
        let rpc_urls = rpc_urls_from_env(&chains);
        Ok(Self {
            signer,
            chains,
            rpc_urls,
            gas_guard: GasGuard::default(),
            native_prices_usd: native_prices_from_env(),
        })
    }

    pub fn with_gas_guard(mut self, gas_guard: GasGuard) -> Self {
        self.gas_guard = gas_guard;
        self
    }

    pub fn with_rpc_url(mut self, chain_enum: &str, url: &str) -> Self {
        self.rpc_urls
            .insert(chain_enum.to_uppercase(), url.to_string());
        self
    }

    pub fn with_native_price(mut self, symbol: &str, usd: f64) -> Self {
        self.native_prices_usd
            .insert(symbol.to_uppercase(), usd);
        self
    }

    /// Address controlled by the signing key.
    pub fn address(&self) -> String {
        format_address(&self.signer.address())
    }

    pub fn gas_cost(&self, chain: &Chain, gas_limit: u64, gas_price: u128) -> GasCost {
        let native_amount = (gas_limit as u128 * gas_price) as f64 / WEI_PER_NATIVE;
        let price = self
            .native_prices_usd
            .get(&chain.native_token_symbol.to_uppercase())
            .copied()
            .unwrap_or_default();
        GasCost {
            gas_limit,
            gas_price: BigUint::from(gas_price),
            native_amount,
            usd_value: native_amount * price,
        }
    }

    fn chain_of(&self, tx: &Transaction) -> Result<&Chain, SubmitError> {
        self.chains
            .find_by_id(tx.chain_id)
            .ok_or_else(|| SubmitError::Other(format!("Unknown chain id {}", tx.chain_id)))
    }
}

#[async_trait]
impl TransactionSubmitter for RpcSubmitter {
    async fn submit(
        &self,
        tx: &Transaction,
        account: &Account,
        options: SubmitOptions,
        on_event: &(dyn Fn(SubmitEvent) + Send + Sync),
    ) -> Result<SubmitReceipt, SubmitError> {
        if !tx.authorizations.is_empty() {
            return Err(SubmitError::Other(
                "EIP-7702 authorizations must be signed by the account keyring".to_string(),
            ));
        }
        let from = parse_address(&account.address).map_err(|e| SubmitError::Other(e.to_string()))?;
        if from != self.signer.address() {
            return Err(SubmitError::Other(format!(
                "Signer does not control account {}",
                account.address
            )));
        }
        let chain = self.chain_of(tx)?;
        let url = rpc_url_for(&self.rpc_urls, chain).map_err(|e| SubmitError::Other(e.to_string()))?;
        let mut request = to_transaction_request(tx).map_err(|e| SubmitError::Other(e.to_string()))?;

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_builtin(url)
            .await
            .map_err(|e| SubmitError::Other(format!("Failed to connect to RPC: {e}")))?;

        let gas_limit = provider
            .estimate_gas(&request)
            .await
            .map_err(|e| SubmitError::SimulationFailed(e.to_string()))?;
        let gas_price = provider
            .get_gas_price()
            .await
            .map_err(|e| SubmitError::Other(format!("Failed to fetch gas price: {e}")))?;
        let gas_cost = self.gas_cost(chain, gas_limit, gas_price);
        debug!(chain = %chain.server_id, gas_limit, usd = gas_cost.usd_value, "Estimated revoke gas");

        let balance = provider
            .get_balance(from)
            .await
            .map_err(|e| SubmitError::Other(format!("Failed to fetch balance: {e}")))?;
        let required = BigUint::from(gas_limit) * &gas_cost.gas_price + &tx.value;
        if u256_to_biguint(balance) < required {
            return Err(SubmitError::GasNotEnough { gas_cost: Some(gas_cost) });
        }
        self.gas_guard
            .check(&chain.server_id, &gas_cost, options.ignore_gas_check)?;

        request.gas = Some(gas_limit);
        on_event(SubmitEvent::Built);
        let pending = provider
            .send_transaction(request)
            .await
            .map_err(|e| SubmitError::SubmitTxFailed(e.to_string()))?;
        on_event(SubmitEvent::Signed);
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| SubmitError::SubmitTxFailed(e.to_string()))?;
        let tx_hash = format!("{:#x}", receipt.transaction_hash);
        if !receipt.status() {
            return Err(SubmitError::SubmitTxFailed(format!("Transaction {tx_hash} reverted")));
        }
        info!(chain = %chain.server_id, %tx_hash, "Revoke transaction mined");
        Ok(SubmitReceipt { tx_hash, gas_cost: Some(gas_cost) })
    }
}

/// Parses `SYMBOL=price` pairs separated by commas; malformed pairs are skipped.
pub fn parse_native_prices(raw: &str) -> HashMap<String, f64> {
    raw.split(',')
        .filter_map(|pair| {
            let (symbol, price) = pair.split_once('=')?;
            let price = price.trim().parse::<f64>().ok()?;
            Some((symbol.trim().to_uppercase(), price))
        })
        .collect()
}

fn native_prices_from_env() -> HashMap<String, f64> {
    dotenv().ok();
    env::var(NATIVE_PRICES_ENV)
        .map(|raw| parse_native_prices(&raw))
        .unwrap_or_default()
}
