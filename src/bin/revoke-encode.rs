use std::io::{self, Read};

use approval_revoke::approvals::{
    aggregator::{ApprovalAggregator, ApprovalsData},
    chains::ChainRegistry,
    config::RevokeSettings,
    data_source::ApprovalsSnapshot,
    evm::{eip7702::DelegationChecker, revoke_tx::EvmRevokeTxBuilder, rpc::RpcChainReader},
    models::{Account, AccountKind, ApprovalAggregate, AssetGrant, RevokeItem},
    selection::{PickTarget, RevokeBatch, Scope, SelectableApproval, SelectionStore},
    sorting::{empty_status, filter_by_keyword, sort_asset_approvals, sort_contract_approvals},
};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod lib {
    pub mod cli;
}

use lib::cli::{Cli, Parser, View};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // Read from stdin until EOF
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("Failed to read from stdin: {}", e))?;

    if buffer.trim().is_empty() {
        return Err("No input provided. Expected an approvals snapshot JSON on stdin.".into());
    }

    let encoded = encode_revokes(&buffer, &cli).await?;

    println!(
        "{}",
        serde_json::to_string(&encoded)
            .map_err(|e| format!("Failed to serialize output: {}", e))?
    );

    Ok(())
}

async fn encode_revokes(input: &str, cli: &Cli) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = ApprovalsSnapshot::from_json(input)?;
    let address = snapshot.address.clone();
    let settings = RevokeSettings::load(cli.settings_file.clone())?;
    let chains = ChainRegistry::new(cli.chains_file.clone())?;

    let aggregator = ApprovalAggregator::new(snapshot)
        .concurrency(settings.aggregate_concurrency)
        .thresholds(settings.risk_thresholds.clone());
    let data = aggregator.load(&address).await?;
    info!(
        contracts = data.contract_map.len(),
        tokens = data.token_map.len(),
        nfts = data.nft_map.len(),
        "Aggregated approvals"
    );

    let keyword = cli.keyword.as_deref().unwrap_or("");
    let store = SelectionStore::default();
    let (total, summary, batch) = match cli.view {
        View::Contract => {
            let sorted = sort_contract_approvals(data.contract_map.values());
            let listed = filter_by_keyword(&sorted, keyword);
            let batch = select_all(&store, &listed, Scope::Contract);
            (sorted.len(), summarize(&listed), batch)
        }
        View::Assets => {
            let sorted = sort_asset_approvals(asset_approvals(&data));
            let listed = filter_by_keyword(&sorted.final_list, keyword);
            let batch = select_all(&store, &listed, Scope::Assets);
            (sorted.final_list.len(), summarize(&listed), batch)
        }
    };

    let account =
        Account { address: address.clone(), kind: AccountKind::SimpleKeyring, alias: None };
    let items: Vec<RevokeItem> = batch
        .dataset
        .iter()
        .filter_map(|grant| batch.revoke_items.get(&grant.key).cloned())
        .collect();
    let builder = EvmRevokeTxBuilder::new(chains.clone());
    let transactions = if cli.group_permit2 {
        builder.encode_batch(&items, &account)?
    } else {
        items
            .iter()
            .map(|item| builder.encode(item, &account))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut output = json!({
        "address": address,
        "view": cli.view.as_str(),
        "empty_status": empty_status(total, summary.len()),
        "approvals": summary,
        "transactions": transactions,
    });

    if cli.check_delegations {
        let checker = DelegationChecker::new(RpcChainReader::from_env(&chains), chains)
            .concurrency(settings.delegation_check_concurrency);
        output["delegations"] = serde_json::to_value(checker.check_all(&address).await?)?;
    }

    Ok(output)
}

fn asset_approvals(data: &ApprovalsData) -> impl Iterator<Item = &ApprovalAggregate<AssetGrant>> {
    data.token_map
        .values()
        .iter()
        .chain(data.nft_map.values())
}

/// Selects every grant of the listed approvals and commits the selection.
fn select_all<A: SelectableApproval>(
    store: &SelectionStore,
    listed: &[&A],
    scope: Scope,
) -> RevokeBatch {
    for approval in listed {
        store.select_all(*approval, true, scope, PickTarget::Final);
    }
    store.revoke_batch(listed.iter().copied(), scope)
}

fn summarize<G>(listed: &[&ApprovalAggregate<G>]) -> Vec<Value> {
    listed
        .iter()
        .map(|approval| {
            json!({
                "type": approval.approval_type,
                "chain": approval.chain,
                "id": approval.id,
                "name": approval.name,
                "risk_level": approval.risk_level,
                "grants": approval.list.len(),
            })
        })
        .collect()
}
