pub const DEFAULT_CHAINS_JSON: &str = include_str!("../../config/chains.json");
pub const DEFAULT_SETTINGS_JSON: &str = include_str!("../../config/revoke_settings.json");

/// Ceiling on concurrent per-chain fetches while aggregating.
pub const DEFAULT_AGGREGATE_CONCURRENCY: usize = 40;

/// Ceiling on concurrent `eth_getCode` calls while checking delegations.
pub const DEFAULT_DELEGATION_CHECK_CONCURRENCY: usize = 10;

/// Gas cost limits (USD) above which a revoke is held back unless the user overrides.
pub const ETH_GAS_LIMIT_USD: f64 = 20.0;
pub const DEFAULT_GAS_LIMIT_USD: f64 = 5.0;

/// Priority of jobs enqueued by `start`. Higher numbers run first.
pub const DEFAULT_JOB_PRIORITY: i32 = -1;

/// Priority used to jump an item to the front of the queue.
pub const RETRY_JOB_PRIORITY: i32 = 0;
