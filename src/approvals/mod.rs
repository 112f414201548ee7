pub mod aggregator;
pub mod builders;
pub mod chains;
pub mod config;
mod constants;
pub mod data_source;
pub mod errors;
#[cfg(feature = "evm")]
pub mod evm;
#[cfg(test)]
mod fakes;
pub mod identity;
pub mod models;
pub mod risk;
pub mod selection;
mod serde_primitives;
pub mod sorting;
pub mod submitter;
pub mod task_queue;
pub mod tx_builder;
pub mod utils;
