use alloy::primitives::Address;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use num_bigint::BigUint;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::approvals::{
    chains::{Chain, ChainRegistry},
    constants::DEFAULT_DELEGATION_CHECK_CONCURRENCY,
    errors::ApprovalError,
    evm::{
        constants::{EIP7702_DELEGATION_MARKER, EIP7702_SUPPORTED_CHAINS},
        utils::{format_address, parse_address},
    },
    models::{Account, DelegationAuthorization, Transaction},
    submitter::{SubmitOptions, SubmitReceipt, TransactionSubmitter},
};

/// Read access to on-chain account state.
#[async_trait]
pub trait ChainStateReader: Send + Sync {
    /// Deployed code at `address`; empty for externally owned accounts.
    async fn get_code(&self, chain: &Chain, address: Address) -> Result<Vec<u8>, ApprovalError>;

    async fn get_transaction_count(
        &self,
        chain: &Chain,
        address: Address,
    ) -> Result<u64, ApprovalError>;
}

/// An account whose code delegates to a contract on one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Eip7702Delegation {
    /// Chain enum name, e.g. `ETH`.
    pub chain: String,
    pub chain_id: u64,
    pub address: String,
    pub delegated_address: String,
}

const ADDRESS_LEN: usize = 20;

/// Returns the delegate of an account from its code, if the code is an EIP-7702 designator.
pub fn parse_delegation(code: &[u8]) -> Option<Address> {
    let target = code.strip_prefix(&EIP7702_DELEGATION_MARKER[..])?;
    if target.len() < ADDRESS_LEN {
        return None;
    }
    Some(Address::from_slice(&target[..ADDRESS_LEN]))
}

/// Type-4 transaction to self clearing the delegation of `account` on `chain`.
///
/// The authorization is signed by the sender, so its nonce is one past the transaction nonce.
pub fn build_delegation_revoke(chain: &Chain, account: &str, nonce: u64) -> Transaction {
    Transaction {
        chain_id: chain.id,
        from: account.to_string(),
        to: account.to_string(),
        value: BigUint::default(),
        data: vec![],
        nonce: Some(nonce),
        authorizations: vec![DelegationAuthorization {
            chain_id: chain.id,
            address: format_address(&Address::ZERO),
            nonce: nonce + 1,
        }],
    }
}

/// Keeps the delegations whose delegate address contains `keyword`, ignoring case.
pub fn filter_delegations(
    delegations: &[Eip7702Delegation],
    keyword: &str,
) -> Vec<Eip7702Delegation> {
    let keyword = keyword.trim().to_lowercase();
    delegations
        .iter()
        .filter(|d| keyword.is_empty() || d.delegated_address.contains(&keyword))
        .cloned()
        .collect()
}

/// Looks up and removes EIP-7702 delegations across the supported chains.
pub struct DelegationChecker<R> {
    reader: R,
    chains: ChainRegistry,
    concurrency: usize,
}

impl<R: ChainStateReader> DelegationChecker<R> {
    pub fn new(reader: R, chains: ChainRegistry) -> Self {
        Self { reader, chains, concurrency: DEFAULT_DELEGATION_CHECK_CONCURRENCY }
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Supported chains known to the registry, in registry order.
    pub fn supported_chains(&self) -> Vec<&Chain> {
        self.chains
            .chains()
            .iter()
            .filter(|chain| EIP7702_SUPPORTED_CHAINS.contains(chain.enum_name.as_str()))
            .collect()
    }

    /// Checks the given chains (by enum name) for a delegation of `address`.
    ///
    /// Unsupported or unknown chains are skipped. A chain whose lookup fails is logged and
    /// reported as not delegated. Results keep the order of `chain_enums`.
    pub async fn check(
        &self,
        address: &str,
        chain_enums: &[String],
    ) -> Result<Vec<Eip7702Delegation>, ApprovalError> {
        let account = parse_address(address)?;
        let chains: Vec<&Chain> = chain_enums
            .iter()
            .filter_map(|name| {
                let chain = self
                    .chains
                    .find_by_enum(name)
                    .filter(|chain| EIP7702_SUPPORTED_CHAINS.contains(chain.enum_name.as_str()));
                if chain.is_none() {
                    debug!(chain = %name, "Skipping chain without EIP-7702 support");
                }
                chain
            })
            .collect();

        let found: Vec<Option<Eip7702Delegation>> = stream::iter(chains)
            .map(|chain| self.check_chain(chain, account))
            .buffered(self.concurrency)
            .collect()
            .await;
        Ok(found.into_iter().flatten().collect())
    }

    /// Checks every supported chain.
    pub async fn check_all(&self, address: &str) -> Result<Vec<Eip7702Delegation>, ApprovalError> {
        let chain_enums: Vec<String> = self
            .supported_chains()
            .into_iter()
            .map(|chain| chain.enum_name.clone())
            .collect();
        self.check(address, &chain_enums).await
    }

    async fn check_chain(&self, chain: &Chain, account: Address) -> Option<Eip7702Delegation> {
        match self.reader.get_code(chain, account).await {
            Ok(code) => parse_delegation(&code).map(|delegate| Eip7702Delegation {
                chain: chain.enum_name.clone(),
                chain_id: chain.id,
                address: format_address(&account),
                delegated_address: format_address(&delegate),
            }),
            Err(err) => {
                warn!(chain = %chain.enum_name, error = %err, "Failed to read account code");
                None
            }
        }
    }

    /// Removes the delegation of `account` on each chain, one chain at a time, stopping at the
    /// first failure.
    pub async fn revoke_delegations(
        &self,
        account: &Account,
        chain_enums: &[String],
        submitter: &dyn TransactionSubmitter,
    ) -> Result<Vec<SubmitReceipt>, ApprovalError> {
        if !account.kind.supports_direct_signing() {
            return Err(ApprovalError::InvalidInput(format!(
                "Account type {:?} cannot sign EIP-7702 authorizations",
                account.kind
            )));
        }
        let address = parse_address(&account.address)?;

        let mut receipts = Vec::with_capacity(chain_enums.len());
        for name in chain_enums {
            let chain = self.chains.find_by_enum(name).ok_or_else(|| {
                ApprovalError::InvalidInput(format!("Unknown chain {name}"))
            })?;
            let nonce = self
                .reader
                .get_transaction_count(chain, address)
                .await?;
            let tx = build_delegation_revoke(chain, &format_address(&address), nonce);
            let receipt = submitter
                .submit(&tx, account, SubmitOptions::default(), &|_| {})
                .await
                .map_err(|err| {
                    error!(chain = %chain.enum_name, error = %err, "EIP-7702 revoke failed");
                    ApprovalError::RecoverableError(format!(
                        "EIP-7702 revoke on {} failed: {err}",
                        chain.enum_name
                    ))
                })?;
            info!(
                chain = %chain.enum_name,
                tx_hash = %receipt.tx_hash,
                "EIP-7702 delegation revoked"
            );
            receipts.push(receipt);
        }
        Ok(receipts)
    }
}
