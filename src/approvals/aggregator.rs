use std::collections::HashMap;

use futures::{stream, StreamExt};
use tracing::{debug, error};

use crate::approvals::{
    constants::DEFAULT_AGGREGATE_CONCURRENCY,
    data_source::ApprovalDataSource,
    errors::ApprovalError,
    models::{
        AggregateDetail, AggregateRef, ApprovalAggregate, ApprovalType, AssetGrant,
        ContractApproval, ContractFor, ContractGrant, NftAbi, NftAuthorizedList, NftSubject,
        RiskLevel, Spender, TokenApprovalRecord, TokenGrant,
    },
    risk::{RiskAboutValues, RiskEvaluation, RiskThresholds},
    sorting::sort_grants,
};

/// Aggregates keyed by subject, iterated in first-insertion order.
#[derive(Clone, Debug)]
pub struct AggregateMap<G> {
    entries: Vec<ApprovalAggregate<G>>,
    index: HashMap<String, usize>,
}

impl<G> Default for AggregateMap<G> {
    fn default() -> Self {
        Self { entries: Vec::new(), index: HashMap::new() }
    }
}

impl<G> AggregateMap<G> {
    fn entry_with(
        &mut self,
        key: String,
        create: impl FnOnce() -> ApprovalAggregate<G>,
    ) -> &mut ApprovalAggregate<G> {
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                self.entries.push(create());
                let idx = self.entries.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        &mut self.entries[idx]
    }

    pub fn get(&self, key: &str) -> Option<&ApprovalAggregate<G>> {
        self.index
            .get(key)
            .map(|idx| &self.entries[*idx])
    }

    /// Looks an aggregate up by identity rather than by map key.
    pub fn find(&self, aggregate: &AggregateRef) -> Option<&ApprovalAggregate<G>> {
        self.entries
            .iter()
            .find(|a| &a.aggregate_ref() == aggregate)
    }

    pub fn values(&self) -> &[ApprovalAggregate<G>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn values_mut(&mut self) -> impl Iterator<Item = &mut ApprovalAggregate<G>> {
        self.entries.iter_mut()
    }
}

/// The three aggregate maps of one address.
///
/// Map keys: contracts `chain:spender`, tokens `chain:token`, NFT collections `chain:contract`
/// and single NFTs `chain:contract:inner_id`.
#[derive(Clone, Debug, Default)]
pub struct ApprovalsData {
    pub contract_map: AggregateMap<ContractGrant>,
    pub token_map: AggregateMap<AssetGrant>,
    pub nft_map: AggregateMap<AssetGrant>,
}

impl ApprovalsData {
    pub fn is_empty(&self) -> bool {
        self.contract_map.is_empty() && self.token_map.is_empty() && self.nft_map.is_empty()
    }

    /// Token or NFT aggregate with the given identity.
    pub fn find_asset(&self, aggregate: &AggregateRef) -> Option<&ApprovalAggregate<AssetGrant>> {
        match aggregate.approval_type {
            ApprovalType::Token => self.token_map.find(aggregate),
            ApprovalType::Nft => self.nft_map.find(aggregate),
            ApprovalType::Contract => None,
        }
    }
}

enum ChainRecords {
    Nft(NftAuthorizedList),
    Tokens(Vec<TokenApprovalRecord>),
}

#[derive(Clone, Copy)]
enum FetchKind {
    Nft,
    Tokens,
}

/// Builds `ApprovalsData` from the raw records served by an `ApprovalDataSource`.
pub struct ApprovalAggregator<D> {
    source: D,
    concurrency: usize,
    thresholds: RiskThresholds,
}

impl<D: ApprovalDataSource> ApprovalAggregator<D> {
    pub fn new(source: D) -> Self {
        Self {
            source,
            concurrency: DEFAULT_AGGREGATE_CONCURRENCY,
            thresholds: RiskThresholds::default(),
        }
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Aggregates every chain the address has been active on.
    pub async fn load(&self, address: &str) -> Result<ApprovalsData, ApprovalError> {
        let used_chains = self
            .source
            .used_chain_list(address)
            .await?;
        Ok(self
            .aggregate(address, &used_chains)
            .await)
    }

    /// Fetches the NFT and token approvals of every given chain and merges them.
    ///
    /// A chain whose fetch fails is logged and left out. Results are merged in input order (NFT
    /// lists first, then token lists) whatever order the fetches complete in.
    pub async fn aggregate(&self, address: &str, used_chains: &[String]) -> ApprovalsData {
        let jobs = used_chains
            .iter()
            .map(|chain| (chain.as_str(), FetchKind::Nft))
            .chain(
                used_chains
                    .iter()
                    .map(|chain| (chain.as_str(), FetchKind::Tokens)),
            );

        let results: Vec<(&str, Result<ChainRecords, ApprovalError>)> = stream::iter(jobs)
            .map(|(chain, kind)| async move { (chain, self.fetch(address, chain, kind).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut data = ApprovalsData::default();
        for (chain, result) in results {
            match result {
                Ok(ChainRecords::Nft(list)) => self.merge_nft(&mut data, chain, list),
                Ok(ChainRecords::Tokens(tokens)) => self.merge_tokens(&mut data, chain, tokens),
                Err(err) => {
                    error!(chain = %chain, error = %err, "Failed to fetch approvals for chain");
                }
            }
        }

        for approval in data
            .token_map
            .values_mut()
            .chain(data.nft_map.values_mut())
        {
            finish_asset_aggregate(approval);
        }
        debug!(
            contracts = data.contract_map.len(),
            tokens = data.token_map.len(),
            nfts = data.nft_map.len(),
            "Aggregated approvals"
        );
        data
    }

    async fn fetch(
        &self,
        address: &str,
        chain: &str,
        kind: FetchKind,
    ) -> Result<ChainRecords, ApprovalError> {
        match kind {
            FetchKind::Nft => Ok(ChainRecords::Nft(
                self.source
                    .user_nft_authorized_list(address, chain)
                    .await?,
            )),
            FetchKind::Tokens => Ok(ChainRecords::Tokens(
                self.source
                    .token_authorized_list(address, chain)
                    .await?,
            )),
        }
    }

    fn contract_aggregate(
        &self,
        chain: &str,
        spender: &Spender,
        contract_for: ContractFor,
    ) -> ContractApproval {
        let risk_about_values = RiskAboutValues::from_spender(spender);
        let risk_evaluation =
            RiskEvaluation::evaluate(spender.risk_level, &risk_about_values, &self.thresholds);
        ApprovalAggregate {
            approval_type: ApprovalType::Contract,
            chain: chain.to_string(),
            id: spender.id.clone(),
            name: spender
                .protocol
                .as_ref()
                .map(|p| p.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            logo_url: spender
                .protocol
                .as_ref()
                .and_then(|p| p.logo_url.clone()),
            risk_level: spender.risk_level,
            risk_alert: spender.risk_alert.clone(),
            risk_about_values,
            risk_evaluation,
            detail: AggregateDetail::Contract { contract_for },
            list: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn asset_aggregate(
        &self,
        approval_type: ApprovalType,
        chain: &str,
        id: &str,
        name: &str,
        logo_url: Option<String>,
        spender: &Spender,
        detail: AggregateDetail,
    ) -> ApprovalAggregate<AssetGrant> {
        let risk_about_values = RiskAboutValues::from_spender(spender);
        let risk_evaluation =
            RiskEvaluation::evaluate(RiskLevel::Safe, &risk_about_values, &self.thresholds);
        ApprovalAggregate {
            approval_type,
            chain: chain.to_string(),
            id: id.to_string(),
            name: name.to_string(),
            logo_url,
            risk_level: RiskLevel::Safe,
            risk_alert: None,
            risk_about_values,
            risk_evaluation,
            detail,
            list: Vec::new(),
        }
    }

    fn merge_nft(&self, data: &mut ApprovalsData, chain: &str, list: NftAuthorizedList) {
        for contract in list.contracts {
            let spender = contract.spender.clone();
            let key = format!("{}:{}", chain, contract.contract_id);
            let detail = AggregateDetail::Nft {
                subject: NftSubject {
                    contract_id: contract.contract_id.clone(),
                    inner_id: None,
                    abi: NftAbi::from_flags(contract.is_erc721, contract.is_erc1155),
                },
                amount: contract.amount.clone(),
            };
            let (id, name, logo_url) = (
                contract.contract_id.clone(),
                contract.contract_name.clone(),
                contract.logo_url.clone(),
            );
            let host = ContractGrant::NftCollection(contract);
            let contract_ref = self.push_contract_grant(
                data,
                chain,
                &spender,
                ContractFor::NftContract,
                host.clone(),
            );

            let nft = data.nft_map.entry_with(key, || {
                self.asset_aggregate(ApprovalType::Nft, chain, &id, &name, logo_url, &spender, detail)
            });
            let asset = nft.aggregate_ref();
            nft.list
                .push(AssetGrant { spender, asset, contract: contract_ref, host });
        }

        for token in list.tokens {
            let spender = token.spender.clone();
            let key = format!("{}:{}:{}", chain, token.contract_id, token.inner_id);
            let detail = AggregateDetail::Nft {
                subject: NftSubject {
                    contract_id: token.contract_id.clone(),
                    inner_id: Some(token.inner_id.clone()),
                    abi: NftAbi::from_flags(token.is_erc721, token.is_erc1155),
                },
                amount: token.amount.clone(),
            };
            let (id, name, logo_url) =
                (token.contract_id.clone(), token.contract_name.clone(), token.content.clone());
            let host = ContractGrant::NftToken(token);
            let contract_ref =
                self.push_contract_grant(data, chain, &spender, ContractFor::Nft, host.clone());

            let nft = data.nft_map.entry_with(key, || {
                self.asset_aggregate(ApprovalType::Nft, chain, &id, &name, logo_url, &spender, detail)
            });
            let asset = nft.aggregate_ref();
            nft.list
                .push(AssetGrant { spender, asset, contract: contract_ref, host });
        }
    }

    fn merge_tokens(&self, data: &mut ApprovalsData, chain: &str, tokens: Vec<TokenApprovalRecord>) {
        for token in tokens {
            for spender in &token.spenders {
                let host = ContractGrant::Token(TokenGrant::new(&token, spender));
                let contract_ref =
                    self.push_contract_grant(data, chain, spender, ContractFor::Token, host.clone());

                let approval = data.token_map.entry_with(
                    format!("{}:{}", chain, token.id),
                    || {
                        self.asset_aggregate(
                            ApprovalType::Token,
                            chain,
                            &token.id,
                            &token.symbol,
                            token.logo_url.clone(),
                            spender,
                            AggregateDetail::Token { balance: token.balance },
                        )
                    },
                );
                let asset = approval.aggregate_ref();
                approval.list.push(AssetGrant {
                    spender: spender.clone(),
                    asset,
                    contract: contract_ref,
                    host,
                });
            }
        }
    }

    /// Appends a raw record to the spender's contract aggregate, creating it on first sight.
    fn push_contract_grant(
        &self,
        data: &mut ApprovalsData,
        chain: &str,
        spender: &Spender,
        contract_for: ContractFor,
        grant: ContractGrant,
    ) -> AggregateRef {
        let contract = data
            .contract_map
            .entry_with(format!("{}:{}", chain, spender.id), || {
                self.contract_aggregate(chain, spender, contract_for)
            });
        contract.list.push(grant);
        contract.aggregate_ref()
    }
}

/// Sorts the grants of a token/NFT aggregate, riskiest first. The aggregate itself stays `Safe`;
/// grant risk only orders the list.
fn finish_asset_aggregate(approval: &mut ApprovalAggregate<AssetGrant>) {
    sort_grants(&mut approval.list);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approvals::{
        data_source::ChainApprovals,
        fakes::{nft_collection, nft_token, spender, token_record, FakeDataSource},
        sorting::sort_asset_approvals,
    };

    #[tokio::test]
    async fn test_same_spender_tokens_share_contract_aggregate() {
        let router = spender("0xrouter", RiskLevel::Safe, 10.0);
        let source = FakeDataSource::new("0xuser").with_chain(
            "eth",
            ChainApprovals {
                tokens: vec![
                    token_record("eth", "0xusdc", vec![router.clone()]),
                    token_record("eth", "0xdai", vec![router.clone()]),
                    token_record("eth", "0xweth", vec![router.clone()]),
                ],
                ..Default::default()
            },
        );
        let data = ApprovalAggregator::new(source)
            .load("0xuser")
            .await
            .unwrap();

        assert_eq!(data.contract_map.len(), 1);
        let contract = data.contract_map.get("eth:0xrouter").unwrap();
        assert_eq!(contract.list.len(), 3);
        assert_eq!(contract.detail, AggregateDetail::Contract { contract_for: ContractFor::Token });
        assert_eq!(data.token_map.len(), 3);
        let usdc = data.token_map.get("eth:0xusdc").unwrap();
        assert_eq!(usdc.list[0].contract, contract.aggregate_ref());
    }

    #[tokio::test]
    async fn test_nft_records_split_by_collection_and_token() {
        let market = spender("0xmarket", RiskLevel::Warning, 0.0);
        let source = FakeDataSource::new("0xuser").with_chain(
            "eth",
            ChainApprovals {
                nft: NftAuthorizedList {
                    total: 3,
                    contracts: vec![nft_collection("eth", "0xpunks", market.clone())],
                    tokens: vec![
                        nft_token("eth", "0xpunks", "1", market.clone()),
                        nft_token("eth", "0xpunks", "2", market.clone()),
                    ],
                },
                tokens: vec![],
            },
        );
        let data = ApprovalAggregator::new(source)
            .load("0xuser")
            .await
            .unwrap();

        let contract = data.contract_map.get("eth:0xmarket").unwrap();
        assert_eq!(contract.list.len(), 3);
        assert_eq!(
            contract.detail,
            AggregateDetail::Contract { contract_for: ContractFor::NftContract }
        );
        assert_eq!(data.nft_map.len(), 3);
        assert!(data.nft_map.get("eth:0xpunks").is_some());
        let single = data.nft_map.get("eth:0xpunks:2").unwrap();
        assert_eq!(single.risk_level, RiskLevel::Safe);
        assert!(matches!(
            &single.detail,
            AggregateDetail::Nft { subject, .. } if subject.inner_id.as_deref() == Some("2")
        ));
    }

    #[tokio::test]
    async fn test_failing_chain_is_skipped() {
        let router = spender("0xrouter", RiskLevel::Safe, 10.0);
        let source = FakeDataSource::new("0xuser")
            .with_chain(
                "eth",
                ChainApprovals {
                    tokens: vec![token_record("eth", "0xusdc", vec![router.clone()])],
                    ..Default::default()
                },
            )
            .with_chain(
                "bsc",
                ChainApprovals {
                    tokens: vec![token_record("bsc", "0xcake", vec![router.clone()])],
                    ..Default::default()
                },
            )
            .failing("bsc");
        let data = ApprovalAggregator::new(source)
            .load("0xuser")
            .await
            .unwrap();

        assert!(data.contract_map.get("eth:0xrouter").is_some());
        assert!(data.contract_map.get("bsc:0xrouter").is_none());
        assert_eq!(data.token_map.len(), 1);
    }

    #[tokio::test]
    async fn test_merge_order_ignores_completion_order() {
        let source = FakeDataSource::new("0xuser")
            .with_chain(
                "eth",
                ChainApprovals {
                    tokens: vec![token_record("eth", "0xusdc", vec![spender("0xa", RiskLevel::Safe, 1.0)])],
                    ..Default::default()
                },
            )
            .with_chain(
                "arb",
                ChainApprovals {
                    tokens: vec![token_record("arb", "0xusdc", vec![spender("0xb", RiskLevel::Safe, 1.0)])],
                    ..Default::default()
                },
            )
            .delayed("eth", 30);
        let data = ApprovalAggregator::new(source)
            .aggregate("0xuser", &["eth".to_string(), "arb".to_string()])
            .await;

        let chains: Vec<&str> = data
            .contract_map
            .values()
            .iter()
            .map(|c| c.chain.as_str())
            .collect();
        assert_eq!(chains, vec!["eth", "arb"]);
    }

    #[tokio::test]
    async fn test_asset_grants_sorted_and_aggregate_stays_safe() {
        let source = FakeDataSource::new("0xuser").with_chain(
            "eth",
            ChainApprovals {
                tokens: vec![token_record(
                    "eth",
                    "0xusdc",
                    vec![
                        spender("0xsafe_big", RiskLevel::Safe, 500.0),
                        spender("0xdanger", RiskLevel::Danger, 1.0),
                        spender("0xsafe_small", RiskLevel::Safe, 5.0),
                    ],
                )],
                ..Default::default()
            },
        );
        let data = ApprovalAggregator::new(source)
            .load("0xuser")
            .await
            .unwrap();

        let usdc = data.token_map.get("eth:0xusdc").unwrap();
        let order: Vec<&str> = usdc.list.iter().map(|g| g.id()).collect();
        assert_eq!(order, vec!["0xdanger", "0xsafe_big", "0xsafe_small"]);
        assert_eq!(usdc.risk_level, RiskLevel::Safe);
        assert_eq!(usdc.risk_alert, None);
        assert_eq!(usdc.risk_evaluation.server_risk_score, 1);

        // A risky grant never moves its asset out of the safe bucket.
        let sorted = sort_asset_approvals(data.token_map.values());
        assert!(sorted.danger.is_empty());
        assert!(sorted.warning.is_empty());
        assert_eq!(sorted.safe.len(), 1);
        assert_eq!(sorted.final_list[0].id, "0xusdc");
    }
}
