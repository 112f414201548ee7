pub use clap::Parser;
use clap::ValueEnum;

/// Which aggregate list the revoke transactions are built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum View {
    /// One entry per spender contract.
    Contract,
    /// One entry per token or NFT.
    Assets,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Contract => "contract",
            View::Assets => "assets",
        }
    }
}

#[derive(Parser)]
/// Encode revoke transactions for every approval of an address
///
/// Reads an approvals snapshot from stdin with the following structure:
/// ```json
/// {
///     "address": "0x...",
///     "used_chains": ["eth", "arb"],
///     "chains": {
///         "eth": {
///             "tokens": [{
///                 "id": "0x...",
///                 "chain": "eth",
///                 "symbol": "USDC",
///                 "spenders": [{"id": "0x...", "permit2_id": null, "risk_level": "safe"}]
///             }],
///             "nft": {"contracts": [], "tokens": []}
///         }
///     }
/// }
/// ```
/// and prints the sorted approvals together with the unsigned revoke transactions.
pub struct Cli {
    /// List to revoke from
    #[arg(short, long, value_enum, default_value_t = View::Contract)]
    pub view: View,

    /// Only revoke approvals whose id, name, chain or risk alert contains this keyword
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Chain list to use instead of the bundled one
    #[arg(long)]
    pub chains_file: Option<String>,

    /// Revoke settings to use instead of the bundled ones
    #[arg(long)]
    pub settings_file: Option<String>,

    /// Fold permit2 allowances sharing a permit2 contract into one lockdown call
    #[arg(long, default_value_t = false)]
    pub group_permit2: bool,

    /// Also look up EIP-7702 delegations of the address (needs RPC_URL_<CHAIN> variables)
    #[arg(long, default_value_t = false)]
    pub check_delegations: bool,
}
