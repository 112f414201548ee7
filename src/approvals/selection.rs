use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
};

use serde::Serialize;
use tracing::warn;

use crate::approvals::{
    identity::{
        asset_grant_to_revoke_item, encode_asset_grant_key, GrantRef, IdentityCodec,
        Permit2Context, SelectionKey, UrlIdentityCodec,
    },
    models::{
        AggregateRef, ApprovalAggregate, AssetGrant, ContractApproval, ContractGrant, RevokeItem,
        Spender,
    },
};

pub type SelectionMap = BTreeMap<SelectionKey, RevokeItem>;

/// The two list contexts selections are tracked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Contract,
    Assets,
}

/// Which of the scope's maps an operation reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PickTarget {
    /// The committed selection shown in the list view.
    Final,
    /// The in-progress selection of an open detail view.
    Focusing,
}

/// A grant as handed to the batch-revoke queue.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevokeGrant {
    pub key: SelectionKey,
    /// The aggregate the grant was selected under.
    pub aggregate: AggregateRef,
    pub spender: Spender,
}

/// A resolvable grant: its identity and the payload needed to revoke it.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionEntry {
    pub grant: RevokeGrant,
    pub item: RevokeItem,
}

impl SelectionEntry {
    pub fn key(&self) -> &SelectionKey {
        &self.grant.key
    }

    /// Entry of a raw record listed under a contract aggregate. `None` when the grant has no
    /// resolvable spender.
    pub fn for_contract_grant(
        codec: &dyn IdentityCodec,
        approval: &ContractApproval,
        grant: &ContractGrant,
    ) -> Option<Self> {
        let aggregate = approval.aggregate_ref();
        let grant_ref = GrantRef::Contract(grant);
        let key = codec.encode_key(&aggregate, grant_ref, Permit2Context::FromGrant)?;
        let item = codec.to_revoke_item(&aggregate, grant_ref, Permit2Context::FromGrant)?;
        Some(Self {
            grant: RevokeGrant { key, aggregate, spender: grant.spender().clone() },
            item,
        })
    }

    /// Entry of a spender grant listed under a token or NFT aggregate.
    pub fn for_asset_grant(codec: &dyn IdentityCodec, grant: &AssetGrant) -> Option<Self> {
        let key = encode_asset_grant_key(codec, grant)?;
        let item = asset_grant_to_revoke_item(codec, grant)?;
        Some(Self {
            grant: RevokeGrant {
                key,
                aggregate: grant.asset.clone(),
                spender: grant.spender.clone(),
            },
            item,
        })
    }
}

/// An aggregate whose grants can be selected.
pub trait SelectableApproval {
    fn aggregate_ref(&self) -> AggregateRef;

    /// Entries of every resolvable grant, in list order. Unresolvable grants are skipped.
    fn selection_entries(&self, codec: &dyn IdentityCodec) -> Vec<SelectionEntry>;

    /// Prefix shared by every key this aggregate can own, when keys are rooted at the
    /// aggregate itself.
    fn key_prefix(&self, _codec: &dyn IdentityCodec) -> Option<String> {
        None
    }
}

impl SelectableApproval for ContractApproval {
    fn aggregate_ref(&self) -> AggregateRef {
        ApprovalAggregate::aggregate_ref(self)
    }

    fn selection_entries(&self, codec: &dyn IdentityCodec) -> Vec<SelectionEntry> {
        self.list
            .iter()
            .filter_map(|grant| {
                let entry = SelectionEntry::for_contract_grant(codec, self, grant);
                if entry.is_none() {
                    warn!(chain = %self.chain, contract = %self.id, "Skipping grant without spender");
                }
                entry
            })
            .collect()
    }

    fn key_prefix(&self, codec: &dyn IdentityCodec) -> Option<String> {
        Some(format!("{}/", codec.index_base(&ApprovalAggregate::aggregate_ref(self))))
    }
}

impl SelectableApproval for ApprovalAggregate<AssetGrant> {
    fn aggregate_ref(&self) -> AggregateRef {
        ApprovalAggregate::aggregate_ref(self)
    }

    fn selection_entries(&self, codec: &dyn IdentityCodec) -> Vec<SelectionEntry> {
        self.list
            .iter()
            .filter_map(|grant| {
                let entry = SelectionEntry::for_asset_grant(codec, grant);
                if entry.is_none() {
                    warn!(chain = %self.chain, asset = %self.id, "Skipping grant without spender");
                }
                entry
            })
            .collect()
    }
}

/// Tri-state checkbox value of an aggregate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub is_selected_all: bool,
    pub is_selected_partial: bool,
}

/// Grants picked for revocation, ready for the batch-revoke queue.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RevokeBatch {
    /// Selected grants in display order.
    pub dataset: Vec<RevokeGrant>,
    pub revoke_items: SelectionMap,
}

#[derive(Debug, Default)]
struct SelectionMaps {
    committed_contract: SelectionMap,
    focusing_contract: SelectionMap,
    committed_assets: SelectionMap,
    focusing_assets: SelectionMap,
}

impl SelectionMaps {
    fn map(&self, scope: Scope, target: PickTarget) -> &SelectionMap {
        match (scope, target) {
            (Scope::Contract, PickTarget::Final) => &self.committed_contract,
            (Scope::Contract, PickTarget::Focusing) => &self.focusing_contract,
            (Scope::Assets, PickTarget::Final) => &self.committed_assets,
            (Scope::Assets, PickTarget::Focusing) => &self.focusing_assets,
        }
    }

    fn map_mut(&mut self, scope: Scope, target: PickTarget) -> &mut SelectionMap {
        match (scope, target) {
            (Scope::Contract, PickTarget::Final) => &mut self.committed_contract,
            (Scope::Contract, PickTarget::Focusing) => &mut self.focusing_contract,
            (Scope::Assets, PickTarget::Final) => &mut self.committed_assets,
            (Scope::Assets, PickTarget::Focusing) => &mut self.focusing_assets,
        }
    }
}

/// Keys an aggregate owns within a map: its grants' keys plus anything under its prefix.
struct Ownership {
    keys: HashSet<SelectionKey>,
    prefix: Option<String>,
}

impl Ownership {
    fn of<A: SelectableApproval + ?Sized>(
        approval: &A,
        codec: &dyn IdentityCodec,
    ) -> (Self, Vec<SelectionEntry>) {
        let entries = approval.selection_entries(codec);
        let keys = entries
            .iter()
            .map(|e| e.key().clone())
            .collect();
        (Self { keys, prefix: approval.key_prefix(codec) }, entries)
    }

    fn owns(&self, key: &SelectionKey) -> bool {
        self.keys.contains(key) ||
            self.prefix
                .as_deref()
                .is_some_and(|prefix| key.starts_with(prefix))
    }
}

/// Owns the committed and focusing selection maps of both scopes.
///
/// Every operation takes the lock once and leaves the maps consistent, so a `commit` never
/// interleaves with a concurrent `toggle`.
pub struct SelectionStore {
    codec: Arc<dyn IdentityCodec>,
    maps: RwLock<SelectionMaps>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new(Arc::new(UrlIdentityCodec))
    }
}

impl SelectionStore {
    pub fn new(codec: Arc<dyn IdentityCodec>) -> Self {
        Self { codec, maps: RwLock::new(SelectionMaps::default()) }
    }

    pub fn codec(&self) -> &dyn IdentityCodec {
        self.codec.as_ref()
    }

    fn read<R>(&self, f: impl FnOnce(&SelectionMaps) -> R) -> R {
        let maps = self
            .maps
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&maps)
    }

    fn write<R>(&self, f: impl FnOnce(&mut SelectionMaps) -> R) -> R {
        let mut maps = self
            .maps
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut maps)
    }

    pub fn contract_entry(
        &self,
        approval: &ContractApproval,
        grant: &ContractGrant,
    ) -> Option<SelectionEntry> {
        let entry = SelectionEntry::for_contract_grant(self.codec(), approval, grant);
        if entry.is_none() {
            warn!(chain = %approval.chain, contract = %approval.id, "Empty selection key");
        }
        entry
    }

    pub fn asset_entry(&self, grant: &AssetGrant) -> Option<SelectionEntry> {
        let entry = SelectionEntry::for_asset_grant(self.codec(), grant);
        if entry.is_none() {
            warn!(chain = %grant.asset.chain, asset = %grant.asset.id, "Empty selection key");
        }
        entry
    }

    /// Toggles the given grants in one map.
    ///
    /// A single grant without an explicit choice flips. With an explicit choice every grant is
    /// set to it; several grants without one are all selected.
    pub fn toggle(
        &self,
        scope: Scope,
        target: PickTarget,
        entries: &[SelectionEntry],
        select: Option<bool>,
    ) {
        if entries.is_empty() {
            return;
        }
        self.write(|maps| {
            let map = maps.map_mut(scope, target);
            if let ([entry], None) = (entries, select) {
                if map.remove(entry.key()).is_none() {
                    map.insert(entry.key().clone(), entry.item.clone());
                }
                return;
            }
            let select = select.unwrap_or(true);
            for entry in entries {
                if select {
                    map.insert(entry.key().clone(), entry.item.clone());
                } else {
                    map.remove(entry.key());
                }
            }
        });
    }

    /// Selects or clears every grant of the aggregate. Clearing also drops any stale key under
    /// the aggregate's prefix.
    pub fn select_all<A: SelectableApproval + ?Sized>(
        &self,
        approval: &A,
        select: bool,
        scope: Scope,
        target: PickTarget,
    ) {
        let (ownership, entries) = Ownership::of(approval, self.codec());
        self.write(|maps| {
            let map = maps.map_mut(scope, target);
            if select {
                for entry in entries {
                    map.insert(entry.grant.key, entry.item);
                }
            } else {
                map.retain(|key, _| !ownership.owns(key));
            }
        });
    }

    /// Opens a detail view: the scope's focusing map becomes exactly the aggregate's committed
    /// selections.
    pub fn start_focus<A: SelectableApproval + ?Sized>(&self, approval: &A, scope: Scope) {
        let (ownership, _) = Ownership::of(approval, self.codec());
        self.write(|maps| {
            let seeded: SelectionMap = maps
                .map(scope, PickTarget::Final)
                .iter()
                .filter(|(key, _)| ownership.owns(key))
                .map(|(key, item)| (key.clone(), item.clone()))
                .collect();
            *maps.map_mut(scope, PickTarget::Focusing) = seeded;
        });
    }

    /// Writes the focusing selection of the aggregate back to the committed map, leaving other
    /// aggregates' committed selections untouched, then clears the focusing map.
    pub fn commit<A: SelectableApproval + ?Sized>(&self, approval: &A, scope: Scope) {
        let (ownership, _) = Ownership::of(approval, self.codec());
        self.write(|maps| {
            let focusing = std::mem::take(maps.map_mut(scope, PickTarget::Focusing));
            let committed = maps.map_mut(scope, PickTarget::Final);
            committed.retain(|key, _| !ownership.owns(key) || focusing.contains_key(key));
            committed.extend(focusing);
        });
    }

    /// Closes a detail view without keeping its changes.
    pub fn discard<A: SelectableApproval + ?Sized>(&self, _approval: &A, scope: Scope) {
        self.write(|maps| maps.map_mut(scope, PickTarget::Focusing).clear());
    }

    pub fn query_is_selected_all<A: SelectableApproval + ?Sized>(
        &self,
        approval: &A,
        scope: Scope,
        target: PickTarget,
    ) -> SelectionState {
        let entries = approval.selection_entries(self.codec());
        let total = entries.len();
        let selected = self.read(|maps| {
            let map = maps.map(scope, target);
            entries
                .iter()
                .filter(|e| map.contains_key(e.key()))
                .count()
        });
        SelectionState {
            is_selected_all: total > 0 && selected == total,
            is_selected_partial: selected > 0 && selected < total,
        }
    }

    /// Whether the "select all" control should select rather than clear.
    pub fn next_should_pick_all<A: SelectableApproval + ?Sized>(
        &self,
        approval: &A,
        scope: Scope,
        target: PickTarget,
    ) -> bool {
        !self
            .query_is_selected_all(approval, scope, target)
            .is_selected_all
    }

    pub fn is_selected(&self, scope: Scope, target: PickTarget, key: &SelectionKey) -> bool {
        self.read(|maps| maps.map(scope, target).contains_key(key))
    }

    /// Clears both maps of the given scope, or of every scope.
    pub fn reset(&self, scope: Option<Scope>) {
        self.write(|maps| match scope {
            Some(scope) => {
                maps.map_mut(scope, PickTarget::Final).clear();
                maps.map_mut(scope, PickTarget::Focusing).clear();
            }
            None => *maps = SelectionMaps::default(),
        });
    }

    pub fn committed(&self, scope: Scope) -> SelectionMap {
        self.read(|maps| maps.map(scope, PickTarget::Final).clone())
    }

    pub fn focusing(&self, scope: Scope) -> SelectionMap {
        self.read(|maps| maps.map(scope, PickTarget::Focusing).clone())
    }

    pub fn revoke_items(&self, scope: Scope) -> Vec<RevokeItem> {
        self.read(|maps| {
            maps.map(scope, PickTarget::Final)
                .values()
                .cloned()
                .collect()
        })
    }

    /// Collects the committed grants of the given aggregates, in their order, for the
    /// batch-revoke queue.
    pub fn revoke_batch<'a, A, I>(&self, approvals: I, scope: Scope) -> RevokeBatch
    where
        A: SelectableApproval + 'a + ?Sized,
        I: IntoIterator<Item = &'a A>,
    {
        let committed = self.committed(scope);
        let mut batch = RevokeBatch::default();
        for approval in approvals {
            for entry in approval.selection_entries(self.codec()) {
                if committed.contains_key(entry.key()) &&
                    !batch
                        .revoke_items
                        .contains_key(entry.key())
                {
                    batch
                        .revoke_items
                        .insert(entry.grant.key.clone(), entry.item);
                    batch.dataset.push(entry.grant);
                }
            }
        }
        batch
    }
}
