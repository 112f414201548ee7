//! In-memory collaborators and fixtures for unit tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use num_bigint::BigUint;
use tokio::sync::Notify;

use crate::approvals::{
    data_source::{ApprovalDataSource, ApprovalsSnapshot, ChainApprovals},
    errors::ApprovalError,
    identity::UrlIdentityCodec,
    models::{
        Account, AccountKind, AggregateDetail, AggregateRef, ApprovalAggregate, ApprovalType,
        AssetGrant, ContractApproval, ContractFor, ContractGrant, NftAuthorizedList,
        NftContractApproval, NftTokenApproval, Protocol, RevokeItem, RiskLevel, Spender,
        TokenApprovalRecord, TokenGrant, Transaction,
    },
    risk::{RiskAboutValues, RiskEvaluation, RiskThresholds},
    selection::{RevokeBatch, SelectableApproval},
    submitter::{
        GasCost, SubmitError, SubmitEvent, SubmitOptions, SubmitReceipt, TransactionSubmitter,
    },
    tx_builder::RevokeTransactionBuilder,
};

pub fn spender(id: &str, risk_level: RiskLevel, value: f64) -> Spender {
    Spender {
        id: id.to_string(),
        protocol: Some(Protocol {
            id: format!("{id}_protocol"),
            name: format!("Protocol {id}"),
            logo_url: None,
        }),
        risk_level,
        value,
        exposure_usd: 1_000_000.0,
        approve_user_count: 1_000,
        ..Default::default()
    }
}

pub fn token_record(chain: &str, id: &str, spenders: Vec<Spender>) -> TokenApprovalRecord {
    TokenApprovalRecord {
        id: id.to_string(),
        chain: chain.to_string(),
        symbol: id.to_uppercase(),
        balance: 1.0,
        price: 1.0,
        spenders,
        ..Default::default()
    }
}

pub fn nft_collection(chain: &str, contract_id: &str, spender: Spender) -> NftContractApproval {
    NftContractApproval {
        chain: chain.to_string(),
        contract_id: contract_id.to_string(),
        contract_name: format!("Collection {contract_id}"),
        is_erc721: true,
        spender,
        ..Default::default()
    }
}

pub fn nft_token(
    chain: &str,
    contract_id: &str,
    inner_id: &str,
    spender: Spender,
) -> NftTokenApproval {
    NftTokenApproval {
        chain: chain.to_string(),
        contract_id: contract_id.to_string(),
        contract_name: format!("Collection {contract_id}"),
        inner_id: inner_id.to_string(),
        is_erc721: true,
        amount: Some(BigUint::from(1u64)),
        spender,
        ..Default::default()
    }
}

fn contract_ref(chain: &str, spender_id: &str) -> AggregateRef {
    AggregateRef {
        approval_type: ApprovalType::Contract,
        chain: chain.to_string(),
        id: spender_id.to_string(),
        nft: None,
    }
}

fn token_ref(chain: &str, token_id: &str) -> AggregateRef {
    AggregateRef {
        approval_type: ApprovalType::Token,
        chain: chain.to_string(),
        id: token_id.to_string(),
        nft: None,
    }
}

fn token_asset_grant(chain: &str, token_id: &str, spender: Spender) -> AssetGrant {
    let record = token_record(chain, token_id, vec![]);
    AssetGrant {
        asset: token_ref(chain, token_id),
        contract: contract_ref(chain, &spender.id),
        host: ContractGrant::Token(TokenGrant::new(&record, &spender)),
        spender,
    }
}

pub fn asset_grant(id: &str, risk_level: RiskLevel, value: f64) -> AssetGrant {
    token_asset_grant("eth", "0xusdc", spender(id, risk_level, value))
}

pub fn contract_approval(
    chain: &str,
    id: &str,
    server_level: RiskLevel,
    spend_usd: f64,
    approve_user_count: u64,
    list_len: usize,
) -> ContractApproval {
    let tokens: Vec<String> = (0..list_len)
        .map(|i| format!("0xtoken{i}"))
        .collect();
    let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let mut approval = contract_with_grants(chain, id, &refs);
    approval.risk_level = server_level;
    approval.risk_about_values =
        RiskAboutValues { risk_spend_usd_value: spend_usd, approve_user_count, ..Default::default() };
    approval.risk_evaluation = RiskEvaluation::evaluate(
        server_level,
        &approval.risk_about_values,
        &RiskThresholds::default(),
    );
    approval
}

/// A contract aggregate of `spender_id` holding one fungible grant per token.
pub fn contract_with_grants(chain: &str, spender_id: &str, tokens: &[&str]) -> ContractApproval {
    let spender = spender(spender_id, RiskLevel::Safe, 1.0);
    let risk_about_values = RiskAboutValues::from_spender(&spender);
    ApprovalAggregate {
        approval_type: ApprovalType::Contract,
        chain: chain.to_string(),
        id: spender_id.to_string(),
        name: spender.protocol_name().to_string(),
        logo_url: None,
        risk_level: RiskLevel::Safe,
        risk_alert: None,
        risk_evaluation: RiskEvaluation::evaluate(
            RiskLevel::Safe,
            &risk_about_values,
            &RiskThresholds::default(),
        ),
        risk_about_values,
        detail: AggregateDetail::Contract { contract_for: ContractFor::Token },
        list: tokens
            .iter()
            .map(|token| {
                let record = token_record(chain, token, vec![]);
                ContractGrant::Token(TokenGrant::new(&record, &spender))
            })
            .collect(),
    }
}

/// A token aggregate with one grant per spender.
pub fn token_with_spenders(
    chain: &str,
    token_id: &str,
    spenders: &[&str],
) -> ApprovalAggregate<AssetGrant> {
    let mut approval = token_approval(chain, token_id, RiskLevel::Safe, 0);
    approval.list = spenders
        .iter()
        .map(|id| token_asset_grant(chain, token_id, spender(id, RiskLevel::Safe, 1.0)))
        .collect();
    approval
}

/// A token aggregate carrying `list_len` anonymous grants.
pub fn token_approval(
    chain: &str,
    id: &str,
    risk_level: RiskLevel,
    list_len: usize,
) -> ApprovalAggregate<AssetGrant> {
    ApprovalAggregate {
        approval_type: ApprovalType::Token,
        chain: chain.to_string(),
        id: id.to_string(),
        name: id.to_string(),
        logo_url: None,
        risk_level,
        risk_alert: None,
        risk_about_values: RiskAboutValues::default(),
        risk_evaluation: RiskEvaluation::default(),
        detail: AggregateDetail::Token { balance: 1.0 },
        list: (0..list_len)
            .map(|i| {
                token_asset_grant(chain, id, spender(&format!("0xspender{i}"), risk_level, 1.0))
            })
            .collect(),
    }
}

pub fn account(kind: AccountKind) -> Account {
    Account {
        address: "0x1111111111111111111111111111111111111111".to_string(),
        kind,
        alias: None,
    }
}

/// A batch revoking the USDC allowance of each spender, all selected.
pub fn revoke_batch(spenders: &[&str]) -> RevokeBatch {
    let token = token_with_spenders("eth", "0xusdc", spenders);
    let mut batch = RevokeBatch::default();
    for entry in token.selection_entries(&UrlIdentityCodec) {
        batch
            .revoke_items
            .insert(entry.grant.key.clone(), entry.item);
        batch.dataset.push(entry.grant);
    }
    batch
}

/// Serves a snapshot, with optional per-chain failures and latency.
#[derive(Clone, Default)]
pub struct FakeDataSource {
    snapshot: ApprovalsSnapshot,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
}

impl FakeDataSource {
    pub fn new(address: &str) -> Self {
        Self {
            snapshot: ApprovalsSnapshot { address: address.to_string(), ..Default::default() },
            ..Default::default()
        }
    }

    pub fn with_chain(mut self, chain: &str, approvals: ChainApprovals) -> Self {
        self.snapshot
            .used_chains
            .push(chain.to_string());
        self.snapshot
            .chains
            .insert(chain.to_string(), approvals);
        self
    }

    pub fn failing(mut self, chain: &str) -> Self {
        self.failing.insert(chain.to_string());
        self
    }

    pub fn delayed(mut self, chain: &str, millis: u64) -> Self {
        self.delays
            .insert(chain.to_string(), Duration::from_millis(millis));
        self
    }

    async fn before_fetch(&self, chain: &str) -> Result<(), ApprovalError> {
        if let Some(delay) = self.delays.get(chain) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(chain) {
            return Err(ApprovalError::RecoverableError(format!("{chain} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl ApprovalDataSource for FakeDataSource {
    async fn used_chain_list(&self, address: &str) -> Result<Vec<String>, ApprovalError> {
        self.snapshot
            .used_chain_list(address)
            .await
    }

    async fn user_nft_authorized_list(
        &self,
        address: &str,
        chain: &str,
    ) -> Result<NftAuthorizedList, ApprovalError> {
        self.before_fetch(chain).await?;
        self.snapshot
            .user_nft_authorized_list(address, chain)
            .await
    }

    async fn token_authorized_list(
        &self,
        address: &str,
        chain: &str,
    ) -> Result<Vec<TokenApprovalRecord>, ApprovalError> {
        self.before_fetch(chain).await?;
        self.snapshot
            .token_authorized_list(address, chain)
            .await
    }
}

/// Builds a placeholder transaction addressed to the spender, so submitters can tell items
/// apart.
#[derive(Clone, Default)]
pub struct FakeTxBuilder;

#[async_trait]
impl RevokeTransactionBuilder for FakeTxBuilder {
    async fn build(
        &self,
        item: &RevokeItem,
        account: &Account,
    ) -> Result<Transaction, ApprovalError> {
        Ok(Transaction {
            chain_id: 1,
            from: account.address.clone(),
            to: item.spender.clone(),
            value: BigUint::default(),
            data: Vec::new(),
            nonce: None,
            authorizations: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubmitCall {
    pub spender: String,
    pub options: SubmitOptions,
    pub tx: Transaction,
}

/// One-shot rendezvous: `entered` fires when the gated submission starts, which then waits for
/// `release`.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
struct SubmitterState {
    calls: Vec<SubmitCall>,
    failures: HashMap<String, VecDeque<SubmitError>>,
    gates: HashMap<String, Arc<Gate>>,
}

/// Records submissions and answers them from a script; unscripted submissions succeed.
#[derive(Clone, Default)]
pub struct FakeSubmitter {
    state: Arc<Mutex<SubmitterState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    delay: Option<Duration>,
    gas_account: bool,
}

impl FakeSubmitter {
    pub fn gas_cost(usd_value: f64) -> GasCost {
        GasCost {
            gas_limit: 50_000,
            gas_price: BigUint::from(2_000_000_000u64),
            native_amount: 0.0001,
            usd_value,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_gas_account(mut self) -> Self {
        self.gas_account = true;
        self
    }

    pub fn fail_next(&self, spender: &str, err: SubmitError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(spender.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn gate(&self, spender: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(spender.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<SubmitCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn spenders(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.spender)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSubmitter for FakeSubmitter {
    async fn submit(
        &self,
        tx: &Transaction,
        _account: &Account,
        options: SubmitOptions,
        on_event: &(dyn Fn(SubmitEvent) + Send + Sync),
    ) -> Result<SubmitReceipt, SubmitError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight
            .fetch_max(now, Ordering::SeqCst);

        let (failure, gate) = {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(SubmitCall { spender: tx.to.clone(), options, tx: tx.clone() });
            let failure = state
                .failures
                .get_mut(&tx.to)
                .and_then(VecDeque::pop_front);
            (failure, state.gates.remove(&tx.to))
        };

        on_event(SubmitEvent::Built);
        if self.gas_account && options.use_gas_account {
            on_event(SubmitEvent::UsingGasAccount);
        }
        on_event(SubmitEvent::Signed);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match failure {
            Some(err) => Err(err),
            None => Ok(SubmitReceipt {
                tx_hash: format!("0xhash_{}", tx.to),
                gas_cost: Some(Self::gas_cost(0.5)),
            }),
        }
    }
}
