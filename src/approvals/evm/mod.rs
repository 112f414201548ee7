pub mod constants;
pub mod eip7702;
pub mod revoke_tx;
pub mod rpc;
pub mod submitter;
pub mod utils;
