use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::Num;

use crate::approvals::{
    chains::ChainRegistry,
    errors::ApprovalError,
    evm::utils::{biguint_to_u256, format_address, parse_address},
    models::{Account, NftAbi, RevokeItem, RevokeTarget, Transaction},
    tx_builder::RevokeTransactionBuilder,
};

sol! {
    function approve(address spender, uint256 amount) external returns (bool);
    function setApprovalForAll(address operator, bool approved) external;

    #[derive(Debug, PartialEq)]
    struct TokenSpenderPair {
        address token;
        address spender;
    }

    function lockdown(TokenSpenderPair[] approvals) external;
}

/// Encodes revoke calls for EVM chains.
///
/// One revoke item turns into one of:
/// - `lockdown([(token, spender)])` on the permit2 contract, for allowances held through permit2
/// - `setApprovalForAll(spender, false)` on the collection, for ERC-1155 and approve-for-all
///   ERC-721 grants
/// - `approve(0x0, tokenId)` on the collection, for a single ERC-721 token
/// - `approve(spender, 0)` on the token, for plain ERC-20 allowances
#[derive(Clone, Debug)]
pub struct EvmRevokeTxBuilder {
    chains: ChainRegistry,
}

impl EvmRevokeTxBuilder {
    pub fn new(chains: ChainRegistry) -> Self {
        Self { chains }
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn encode(&self, item: &RevokeItem, account: &Account) -> Result<Transaction, ApprovalError> {
        let chain = self.chains.get(&item.chain)?;
        let from = parse_address(&account.address)?;
        let spender = parse_address(&item.spender)?;

        let (to, data) = match &item.target {
            RevokeTarget::Token { token_id } => {
                let token = parse_address(token_id)?;
                match &item.permit2_id {
                    Some(permit2_id) => (
                        parse_address(permit2_id)?,
                        lockdownCall { approvals: vec![TokenSpenderPair { token, spender }] }
                            .abi_encode(),
                    ),
                    None => (token, approveCall { spender, amount: U256::ZERO }.abi_encode()),
                }
            }
            RevokeTarget::Nft { contract_id, abi, nft_token_id, is_approved_for_all } => {
                let contract = parse_address(contract_id)?;
                let data = match abi {
                    NftAbi::Erc721 if *is_approved_for_all => {
                        setApprovalForAllCall { operator: spender, approved: false }.abi_encode()
                    }
                    NftAbi::Erc721 => {
                        let token_id = nft_token_id.as_deref().ok_or_else(|| {
                            ApprovalError::InvalidInput(format!(
                                "Missing token id for ERC721 approval on {contract_id}"
                            ))
                        })?;
                        approveCall { spender: Address::ZERO, amount: parse_token_id(token_id)? }
                            .abi_encode()
                    }
                    NftAbi::Erc1155 => {
                        setApprovalForAllCall { operator: spender, approved: false }.abi_encode()
                    }
                    NftAbi::Unknown => {
                        return Err(ApprovalError::InvalidInput(format!(
                            "Unknown NFT standard for contract {contract_id}"
                        )))
                    }
                };
                (contract, data)
            }
        };

        Ok(Transaction {
            chain_id: chain.id,
            from: format_address(&from),
            to: format_address(&to),
            value: BigUint::default(),
            data,
            nonce: None,
            authorizations: vec![],
        })
    }

    /// Encodes a whole batch, folding every permit2 allowance sharing a chain and permit2
    /// contract into a single `lockdown` call. Permit2 transactions come first, in key order,
    /// followed by the remaining items in input order.
    pub fn encode_batch(
        &self,
        items: &[RevokeItem],
        account: &Account,
    ) -> Result<Vec<Transaction>, ApprovalError> {
        let mut lockdowns: BTreeMap<(String, String), Vec<TokenSpenderPair>> = BTreeMap::new();
        let mut single = Vec::new();
        for item in items {
            match (&item.permit2_id, &item.target) {
                (Some(permit2_id), RevokeTarget::Token { token_id }) => {
                    lockdowns
                        .entry((item.chain.clone(), permit2_id.to_lowercase()))
                        .or_default()
                        .push(TokenSpenderPair {
                            token: parse_address(token_id)?,
                            spender: parse_address(&item.spender)?,
                        });
                }
                _ => single.push(self.encode(item, account)?),
            }
        }

        let from = format_address(&parse_address(&account.address)?);
        let mut transactions = Vec::with_capacity(lockdowns.len() + single.len());
        for ((chain, permit2_id), approvals) in lockdowns {
            let chain = self.chains.get(&chain)?;
            transactions.push(Transaction {
                chain_id: chain.id,
                from: from.clone(),
                to: format_address(&parse_address(&permit2_id)?),
                value: BigUint::default(),
                data: lockdownCall { approvals }.abi_encode(),
                nonce: None,
                authorizations: vec![],
            });
        }
        transactions.extend(single);
        Ok(transactions)
    }
}

#[async_trait]
impl RevokeTransactionBuilder for EvmRevokeTxBuilder {
    async fn build(
        &self,
        item: &RevokeItem,
        account: &Account,
    ) -> Result<Transaction, ApprovalError> {
        self.encode(item, account)
    }
}

/// NFT token ids come as decimal strings, occasionally as `0x` hex.
fn parse_token_id(token_id: &str) -> Result<U256, ApprovalError> {
    let parsed = match token_id.strip_prefix("0x") {
        Some(hex_part) => BigUint::from_str_radix(hex_part, 16),
        None => BigUint::from_str_radix(token_id, 10),
    }
    .map_err(|_| ApprovalError::InvalidInput(format!("Invalid NFT token id: {token_id}")))?;
    biguint_to_u256(&parsed)
        .map_err(|_| ApprovalError::InvalidInput(format!("Invalid NFT token id: {token_id}")))
}
