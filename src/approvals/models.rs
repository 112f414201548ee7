use std::{cmp::Ordering, fmt};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::approvals::{
    risk::{RiskAboutValues, RiskEvaluation},
    serde_primitives::{biguint_string, biguint_string_option},
};

/// The three shapes an approval aggregate can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalType {
    Contract,
    Token,
    Nft,
}

impl ApprovalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalType::Contract => "contract",
            ApprovalType::Token => "token",
            ApprovalType::Nft => "nft",
        }
    }
}

impl fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-reported risk level of a spender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Safe,
    Warning,
    Danger,
}

impl RiskLevel {
    /// Numeric weight of the level: safe=1, warning=10, danger=100.
    pub fn score(&self) -> u32 {
        match self {
            RiskLevel::Safe => 1,
            RiskLevel::Warning => 10,
            RiskLevel::Danger => 100,
        }
    }

    /// Inverse of `score` for the exact weights; any other number has no level.
    pub fn from_score(score: u32) -> Option<Self> {
        match score {
            1 => Some(RiskLevel::Safe),
            10 => Some(RiskLevel::Warning),
            100 => Some(RiskLevel::Danger),
            _ => None,
        }
    }
}

impl PartialOrd for RiskLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RiskLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score().cmp(&other.score())
    }
}

/// ABI family of an NFT contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NftAbi {
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC1155")]
    Erc1155,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl NftAbi {
    pub fn from_flags(is_erc721: bool, is_erc1155: bool) -> Self {
        if is_erc721 {
            NftAbi::Erc721
        } else if is_erc1155 {
            NftAbi::Erc1155
        } else {
            NftAbi::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NftAbi::Erc721 => "ERC721",
            NftAbi::Erc1155 => "ERC1155",
            NftAbi::Unknown => "",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Protocol {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Spender metadata attached by the approvals API to every raw approval record.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Spender {
    /// Address of the spender contract.
    pub id: String,
    /// Set when the allowance is held through a permit2 contract; holds that contract's address.
    #[serde(default)]
    pub permit2_id: Option<String>,
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub risk_alert: Option<String>,
    /// Approved value in USD.
    #[serde(default)]
    pub value: f64,
    /// USD value users have approved to this spender across the network ("trust value").
    #[serde(default)]
    pub exposure_usd: f64,
    #[serde(default)]
    pub approve_user_count: u64,
    #[serde(default)]
    pub revoke_user_count: u64,
    /// Unix timestamp (seconds) of the latest approval.
    #[serde(default)]
    pub last_approve_at: Option<i64>,
}

impl Spender {
    pub fn protocol_name(&self) -> &str {
        self.protocol
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("")
    }
}

/// "Approve for all" grant on a whole NFT collection.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NftContractApproval {
    pub chain: String,
    pub contract_id: String,
    pub contract_name: String,
    #[serde(default)]
    pub is_erc721: bool,
    #[serde(default)]
    pub is_erc1155: bool,
    #[serde(default, with = "biguint_string_option")]
    pub amount: Option<BigUint>,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub spender: Spender,
}

/// Grant on one single NFT.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NftTokenApproval {
    pub chain: String,
    pub contract_id: String,
    pub contract_name: String,
    /// Token id inside the collection.
    pub inner_id: String,
    #[serde(default)]
    pub is_erc721: bool,
    #[serde(default)]
    pub is_erc1155: bool,
    #[serde(default, with = "biguint_string_option")]
    pub amount: Option<BigUint>,
    #[serde(default)]
    pub content: Option<String>,
    pub spender: Spender,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NftAuthorizedList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub contracts: Vec<NftContractApproval>,
    #[serde(default)]
    pub tokens: Vec<NftTokenApproval>,
}

/// One fungible token together with every spender holding an allowance on it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TokenApprovalRecord {
    /// Token contract address.
    pub id: String,
    pub chain: String,
    pub symbol: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub spenders: Vec<Spender>,
}

/// A fungible token approval narrowed to the single spender it was indexed by.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TokenGrant {
    pub id: String,
    pub chain: String,
    pub symbol: String,
    pub logo_url: Option<String>,
    pub balance: f64,
    pub spender: Spender,
}

impl TokenGrant {
    pub fn new(token: &TokenApprovalRecord, spender: &Spender) -> Self {
        Self {
            id: token.id.clone(),
            chain: token.chain.clone(),
            symbol: token.symbol.clone(),
            logo_url: token.logo_url.clone(),
            balance: token.balance,
            spender: spender.clone(),
        }
    }
}

/// One raw approval record as listed under a contract aggregate.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractGrant {
    NftToken(NftTokenApproval),
    NftCollection(NftContractApproval),
    Token(TokenGrant),
}

impl ContractGrant {
    pub fn spender(&self) -> &Spender {
        match self {
            ContractGrant::NftToken(token) => &token.spender,
            ContractGrant::NftCollection(contract) => &contract.spender,
            ContractGrant::Token(token) => &token.spender,
        }
    }

    pub fn chain(&self) -> &str {
        match self {
            ContractGrant::NftToken(token) => &token.chain,
            ContractGrant::NftCollection(contract) => &contract.chain,
            ContractGrant::Token(token) => &token.chain,
        }
    }

    /// The spender-level record a fungible grant was indexed by, used for permit2 lookups. NFT
    /// grants are not indexed by spender.
    pub fn indexed_spender(&self) -> Option<&Spender> {
        match self {
            ContractGrant::Token(token) => Some(&token.spender),
            _ => None,
        }
    }

    pub fn abi(&self) -> NftAbi {
        match self {
            ContractGrant::NftToken(token) => NftAbi::from_flags(token.is_erc721, token.is_erc1155),
            ContractGrant::NftCollection(contract) => {
                NftAbi::from_flags(contract.is_erc721, contract.is_erc1155)
            }
            ContractGrant::Token(_) => NftAbi::Unknown,
        }
    }

    /// Id of the approved asset: token address, or NFT contract address.
    pub fn asset_id(&self) -> &str {
        match self {
            ContractGrant::NftToken(token) => &token.contract_id,
            ContractGrant::NftCollection(contract) => &contract.contract_id,
            ContractGrant::Token(token) => &token.id,
        }
    }
}

/// The NFT (single token or whole collection) an NFT aggregate is about.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NftSubject {
    pub contract_id: String,
    /// `None` for a collection-wide approval.
    pub inner_id: Option<String>,
    pub abi: NftAbi,
}

/// Non-owning reference to an aggregate by identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateRef {
    pub approval_type: ApprovalType,
    pub chain: String,
    pub id: String,
    #[serde(default)]
    pub nft: Option<NftSubject>,
}

/// A spender grant as listed under a token or NFT aggregate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssetGrant {
    pub spender: Spender,
    /// The token or NFT aggregate this grant is listed under.
    pub asset: AggregateRef,
    /// The contract aggregate of the spender.
    pub contract: AggregateRef,
    /// The raw record the grant was built from, as listed under `contract`.
    pub host: ContractGrant,
}

impl AssetGrant {
    pub fn id(&self) -> &str {
        &self.spender.id
    }
}

/// What kind of approvals a contract aggregate was first seen with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractFor {
    Token,
    Nft,
    NftContract,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateDetail {
    Contract {
        contract_for: ContractFor,
    },
    Token {
        balance: f64,
    },
    Nft {
        subject: NftSubject,
        #[serde(with = "biguint_string_option")]
        amount: Option<BigUint>,
    },
}

/// Grouped view of every grant sharing one subject (a spender contract, a token or an NFT).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApprovalAggregate<G> {
    pub approval_type: ApprovalType,
    pub chain: String,
    pub id: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub risk_level: RiskLevel,
    pub risk_alert: Option<String>,
    pub risk_about_values: RiskAboutValues,
    pub risk_evaluation: RiskEvaluation,
    pub detail: AggregateDetail,
    pub list: Vec<G>,
}

impl<G> ApprovalAggregate<G> {
    pub fn aggregate_ref(&self) -> AggregateRef {
        let nft = match &self.detail {
            AggregateDetail::Nft { subject, .. } => Some(subject.clone()),
            _ => None,
        };
        AggregateRef {
            approval_type: self.approval_type,
            chain: self.chain.clone(),
            id: self.id.clone(),
            nft,
        }
    }
}

pub type ContractApproval = ApprovalAggregate<ContractGrant>;
pub type TokenApproval = ApprovalAggregate<AssetGrant>;
pub type NftApproval = ApprovalAggregate<AssetGrant>;

/// What a revoke transaction acts upon.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevokeTarget {
    /// An ERC-20 allowance on `token_id`.
    Token { token_id: String },
    Nft {
        contract_id: String,
        abi: NftAbi,
        nft_token_id: Option<String>,
        is_approved_for_all: bool,
    },
}

/// Minimal payload needed to build one on-chain revoke call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevokeItem {
    pub approval_type: ApprovalType,
    /// Chain server id, e.g. `eth`.
    pub chain: String,
    pub spender: String,
    pub permit2_id: Option<String>,
    pub target: RevokeTarget,
}

/// An EIP-7702 authorization tuple attached to a type-4 transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationAuthorization {
    pub chain_id: u64,
    pub address: String,
    pub nonce: u64,
}

/// Unsigned transaction handed to a submitter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
    pub chain_id: u64,
    pub from: String,
    // Address of the contract to call with the calldata
    pub to: String,
    #[serde(with = "biguint_string")]
    pub value: BigUint,
    #[serde(serialize_with = "serialize_calldata")]
    pub data: Vec<u8>,
    pub nonce: Option<u64>,
    /// Non-empty only for EIP-7702 transactions.
    pub authorizations: Vec<DelegationAuthorization>,
}

fn serialize_calldata<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(data)))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    SimpleKeyring,
    HdKeyring,
    Ledger,
    Trezor,
    OneKey,
    Keystone,
    WalletConnect,
    WatchAddress,
}

impl AccountKind {
    /// Key-holding accounts that can sign without an interactive confirmation.
    pub fn supports_direct_signing(&self) -> bool {
        matches!(self, AccountKind::SimpleKeyring | AccountKind::HdKeyring)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub kind: AccountKind,
    #[serde(default)]
    pub alias: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_order_follows_score() {
        let mut levels = vec![RiskLevel::Warning, RiskLevel::Danger, RiskLevel::Safe];
        levels.sort();
        assert_eq!(levels, vec![RiskLevel::Safe, RiskLevel::Warning, RiskLevel::Danger]);
        assert_eq!(RiskLevel::from_score(RiskLevel::Warning.score()), Some(RiskLevel::Warning));
        assert_eq!(RiskLevel::from_score(11), None);
    }

    #[test]
    fn test_deserialize_token_record() {
        let raw = r#"{
            "id": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "chain": "eth",
            "symbol": "USDC",
            "balance": 12.5,
            "spenders": [{
                "id": "0x000000000022d473030f116ddee9f6b43ac78ba3",
                "permit2_id": "0x000000000022d473030f116ddee9f6b43ac78ba3",
                "risk_level": "warning",
                "value": 100.0,
                "protocol": {"id": "uniswap", "name": "Uniswap"}
            }]
        }"#;
        let record: TokenApprovalRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.spenders.len(), 1);
        assert_eq!(record.spenders[0].risk_level, RiskLevel::Warning);
        assert_eq!(record.spenders[0].protocol_name(), "Uniswap");
        assert_eq!(record.spenders[0].approve_user_count, 0);
    }

    #[test]
    fn test_contract_grant_indexed_spender_only_for_tokens() {
        let spender = Spender { id: "0xspender".to_string(), ..Default::default() };
        let token = ContractGrant::Token(TokenGrant {
            id: "0xtoken".to_string(),
            chain: "eth".to_string(),
            spender: spender.clone(),
            ..Default::default()
        });
        let nft = ContractGrant::NftCollection(NftContractApproval {
            chain: "eth".to_string(),
            contract_id: "0xnft".to_string(),
            is_erc1155: true,
            spender,
            ..Default::default()
        });
        assert!(token.indexed_spender().is_some());
        assert!(nft.indexed_spender().is_none());
        assert_eq!(nft.abi(), NftAbi::Erc1155);
        assert_eq!(nft.asset_id(), "0xnft");
    }
}
