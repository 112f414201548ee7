use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::approvals::models::{
    AggregateRef, ApprovalType, AssetGrant, ContractGrant, NftAbi, RevokeItem, RevokeTarget,
    Spender,
};

/// Opaque key identifying one spender grant inside one approval aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionKey(String);

impl SelectionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The grant half of an identity: a raw record under a contract aggregate, or a spender under
/// a token/NFT aggregate.
#[derive(Clone, Copy, Debug)]
pub enum GrantRef<'a> {
    Contract(&'a ContractGrant),
    Spender(&'a Spender),
}

/// Where the permit2 id of a contract-side grant comes from.
#[derive(Clone, Copy, Debug, Default)]
pub enum Permit2Context<'a> {
    #[default]
    None,
    /// Use the spender record the grant was indexed by (see `ContractGrant::indexed_spender`).
    FromGrant,
    /// Use an asset-side spender, when the grant is reached from a token or NFT aggregate.
    Spender(&'a Spender),
}

impl<'a> Permit2Context<'a> {
    fn permit2_id(&self, grant: &'a ContractGrant) -> Option<&'a str> {
        let spender = match *self {
            Permit2Context::None => None,
            Permit2Context::FromGrant => grant.indexed_spender(),
            Permit2Context::Spender(spender) => Some(spender),
        };
        spender.and_then(|s| s.permit2_id.as_deref())
    }
}

/// Computes selection keys and revoke payloads for grants.
///
/// Implementations must be pure: structurally equal inputs always yield equal outputs, and
/// distinct grants never share a key. `None` signals an unresolvable grant (empty spender);
/// callers treat it as a no-op.
pub trait IdentityCodec: Send + Sync {
    /// Prefix shared by the keys of every grant of `approval`.
    fn index_base(&self, approval: &AggregateRef) -> String;

    fn encode_key(
        &self,
        approval: &AggregateRef,
        grant: GrantRef<'_>,
        context: Permit2Context<'_>,
    ) -> Option<SelectionKey>;

    fn to_revoke_item(
        &self,
        approval: &AggregateRef,
        grant: GrantRef<'_>,
        context: Permit2Context<'_>,
    ) -> Option<RevokeItem>;
}

/// Encodes keys as `approval://<type>-<chain>-<id>/<shape>/?<query>` URLs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UrlIdentityCodec;

fn encode_query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

impl IdentityCodec for UrlIdentityCodec {
    fn index_base(&self, approval: &AggregateRef) -> String {
        format!("approval://{}-{}-{}", approval.approval_type, approval.chain, approval.id)
    }

    fn encode_key(
        &self,
        approval: &AggregateRef,
        grant: GrantRef<'_>,
        context: Permit2Context<'_>,
    ) -> Option<SelectionKey> {
        let base = self.index_base(approval);
        let key = match (approval.approval_type, grant) {
            (ApprovalType::Contract, GrantRef::Contract(host)) => {
                let permit2_id = context.permit2_id(host).unwrap_or("");
                match host {
                    ContractGrant::NftToken(token) => {
                        non_empty(&token.spender.id)?;
                        format!(
                            "{base}/contract-token/?{}",
                            encode_query(&[
                                ("chainServerId", token.chain.as_str()),
                                ("contractId", token.contract_id.as_str()),
                                ("permit2Id", permit2_id),
                                ("spender", token.spender.id.as_str()),
                                ("abi", host.abi().as_str()),
                                ("nftTokenId", token.inner_id.as_str()),
                                ("isApprovedForAll", "false"),
                            ])
                        )
                    }
                    ContractGrant::NftCollection(contract) => {
                        non_empty(&contract.spender.id)?;
                        format!(
                            "{base}/contract/?{}",
                            encode_query(&[
                                ("chainServerId", contract.chain.as_str()),
                                ("contractId", contract.contract_id.as_str()),
                                ("permit2Id", permit2_id),
                                ("spender", contract.spender.id.as_str()),
                                ("abi", host.abi().as_str()),
                                ("isApprovedForAll", "true"),
                            ])
                        )
                    }
                    ContractGrant::Token(token) => {
                        non_empty(&approval.id)?;
                        format!(
                            "{base}/contract/?{}",
                            encode_query(&[
                                ("chainServerId", approval.chain.as_str()),
                                ("permit2Id", permit2_id),
                                ("tokenId", token.id.as_str()),
                                ("id", token.id.as_str()),
                                ("spender", approval.id.as_str()),
                            ])
                        )
                    }
                }
            }
            (ApprovalType::Token, GrantRef::Spender(spender)) => {
                non_empty(&spender.id)?;
                format!(
                    "{base}/token/?{}",
                    encode_query(&[
                        ("spender", spender.id.as_str()),
                        ("chainServerId", approval.chain.as_str()),
                        ("id", approval.id.as_str()),
                    ])
                )
            }
            (ApprovalType::Nft, GrantRef::Spender(spender)) => {
                non_empty(&spender.id)?;
                let (contract_id, inner_id, abi) = nft_subject_fields(approval);
                format!(
                    "{base}/nft/?{}",
                    encode_query(&[
                        ("chainServerId", approval.chain.as_str()),
                        ("contractId", contract_id),
                        ("spender", spender.id.as_str()),
                        ("nftTokenId", inner_id.unwrap_or("")),
                        ("abi", abi.as_str()),
                        ("isApprovedForAll", bool_str(inner_id.is_none())),
                    ])
                )
            }
            // A grant shape that does not belong to this aggregate type.
            _ => return None,
        };
        Some(SelectionKey(key))
    }

    fn to_revoke_item(
        &self,
        approval: &AggregateRef,
        grant: GrantRef<'_>,
        context: Permit2Context<'_>,
    ) -> Option<RevokeItem> {
        match (approval.approval_type, grant) {
            (ApprovalType::Contract, GrantRef::Contract(host)) => {
                let permit2_id = context.permit2_id(host).map(str::to_string);
                match host {
                    ContractGrant::NftToken(token) => Some(RevokeItem {
                        approval_type: ApprovalType::Contract,
                        chain: token.chain.clone(),
                        spender: non_empty(&token.spender.id)?.to_string(),
                        permit2_id,
                        target: RevokeTarget::Nft {
                            contract_id: token.contract_id.clone(),
                            abi: host.abi(),
                            nft_token_id: Some(token.inner_id.clone()),
                            is_approved_for_all: false,
                        },
                    }),
                    ContractGrant::NftCollection(contract) => Some(RevokeItem {
                        approval_type: ApprovalType::Contract,
                        chain: contract.chain.clone(),
                        spender: non_empty(&contract.spender.id)?.to_string(),
                        permit2_id,
                        target: RevokeTarget::Nft {
                            contract_id: contract.contract_id.clone(),
                            abi: host.abi(),
                            nft_token_id: None,
                            is_approved_for_all: true,
                        },
                    }),
                    ContractGrant::Token(token) => Some(RevokeItem {
                        approval_type: ApprovalType::Contract,
                        chain: approval.chain.clone(),
                        spender: non_empty(&approval.id)?.to_string(),
                        permit2_id,
                        target: RevokeTarget::Token { token_id: token.id.clone() },
                    }),
                }
            }
            (ApprovalType::Token, GrantRef::Spender(spender)) => Some(RevokeItem {
                approval_type: ApprovalType::Token,
                chain: approval.chain.clone(),
                spender: non_empty(&spender.id)?.to_string(),
                permit2_id: None,
                target: RevokeTarget::Token { token_id: approval.id.clone() },
            }),
            (ApprovalType::Nft, GrantRef::Spender(spender)) => {
                let (contract_id, inner_id, abi) = nft_subject_fields(approval);
                Some(RevokeItem {
                    approval_type: ApprovalType::Nft,
                    chain: approval.chain.clone(),
                    spender: non_empty(&spender.id)?.to_string(),
                    permit2_id: None,
                    target: RevokeTarget::Nft {
                        contract_id: contract_id.to_string(),
                        abi,
                        nft_token_id: inner_id.map(str::to_string),
                        is_approved_for_all: inner_id.is_none(),
                    },
                })
            }
            _ => None,
        }
    }
}

fn non_empty(id: &str) -> Option<&str> {
    if id.trim().is_empty() {
        None
    } else {
        Some(id)
    }
}

fn nft_subject_fields(approval: &AggregateRef) -> (&str, Option<&str>, NftAbi) {
    match &approval.nft {
        Some(subject) => (subject.contract_id.as_str(), subject.inner_id.as_deref(), subject.abi),
        None => ("", None, NftAbi::Unknown),
    }
}

/// Key of an asset-side grant. Asset grants are identified through their contract aggregate
/// and raw record, so the same grant selected from either view yields the same key.
pub fn encode_asset_grant_key(
    codec: &dyn IdentityCodec,
    grant: &AssetGrant,
) -> Option<SelectionKey> {
    codec.encode_key(
        &grant.contract,
        GrantRef::Contract(&grant.host),
        Permit2Context::Spender(&grant.spender),
    )
}

pub fn asset_grant_to_revoke_item(
    codec: &dyn IdentityCodec,
    grant: &AssetGrant,
) -> Option<RevokeItem> {
    codec.to_revoke_item(
        &grant.contract,
        GrantRef::Contract(&grant.host),
        Permit2Context::Spender(&grant.spender),
    )
}
