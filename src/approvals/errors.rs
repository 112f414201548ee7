use std::{fmt, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents the outer-level, user-facing errors of the approval-revoke package.
///
/// Variants:
/// - `InvalidInput`: the operation failed because of bad input (an unknown chain, a malformed
///   address, an NFT record without a recognised ABI, ...).
/// - `FatalError`: there is a problem with the application setup, such as a missing config file
///   or RPC url.
/// - `RecoverableError`: the operation failed with a recoverable error. Retrying at a later time
///   may succeed. It may have failed due to a temporary issue, such as a network problem.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ApprovalError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Fatal error: {0}")]
    FatalError(String),
    #[error("Recoverable error: {0}")]
    RecoverableError(String),
}

impl From<io::Error> for ApprovalError {
    fn from(err: io::Error) -> Self {
        ApprovalError::FatalError(err.to_string())
    }
}

impl From<serde_json::Error> for ApprovalError {
    fn from(err: serde_json::Error) -> Self {
        ApprovalError::FatalError(err.to_string())
    }
}

/// Classification recorded on a failed batch-revoke item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailedCode {
    GasNotEnough,
    /// Can be overridden by resubmitting the item with the gas check disabled.
    GasTooHigh,
    SubmitTxFailed,
    SimulationFailed,
    DefaultFailed,
}

impl FailedCode {
    /// User-facing reason shown next to a failed revoke.
    pub fn reason(&self) -> &'static str {
        match self {
            FailedCode::GasNotEnough => "Insufficient gas balance",
            FailedCode::GasTooHigh => "Gas cost is higher than usual",
            FailedCode::SubmitTxFailed => "Failed to submit the transaction",
            FailedCode::SimulationFailed => "Transaction simulation failed",
            FailedCode::DefaultFailed => "Revoke failed",
        }
    }
}

impl fmt::Display for FailedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())
    }
}
