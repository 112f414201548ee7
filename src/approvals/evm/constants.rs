use std::{collections::HashSet, sync::LazyLock};

/// Code prefix of an EIP-7702 delegated account: `0xef0100 || address`.
pub const EIP7702_DELEGATION_MARKER: [u8; 3] = [0xef, 0x01, 0x00];

/// Chains (by enum name) where EIP-7702 delegations are looked up.
pub static EIP7702_SUPPORTED_CHAINS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut set = HashSet::new();
    set.insert("ETH");
    set.insert("BSC");
    set.insert("OP");
    set.insert("BASE");
    set.insert("ARBITRUM");
    set.insert("SCRL");
    set.insert("BERA");
    set.insert("UNI");
    set.insert("INK");
    set
});

/// Prefix of the environment variables holding a chain's RPC url, e.g. `RPC_URL_ETH`.
pub const RPC_URL_ENV_PREFIX: &str = "RPC_URL_";

/// Environment variable holding native token prices in USD, e.g. `ETH=2500,BNB=600`.
pub const NATIVE_PRICES_ENV: &str = "REVOKE_NATIVE_PRICES_USD";
