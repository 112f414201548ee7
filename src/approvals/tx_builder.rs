use async_trait::async_trait;

use crate::approvals::{
    errors::ApprovalError,
    models::{Account, RevokeItem, Transaction},
};

/// Turns a revoke payload into an unsigned transaction from the given account.
#[async_trait]
pub trait RevokeTransactionBuilder: Send + Sync {
    async fn build(&self, item: &RevokeItem, account: &Account)
        -> Result<Transaction, ApprovalError>;
}
