use std::sync::Arc;

#[cfg(feature = "evm")]
use crate::approvals::{chains::ChainRegistry, evm::revoke_tx::EvmRevokeTxBuilder};
use crate::approvals::{
    errors::ApprovalError, models::Account, submitter::TransactionSubmitter,
    task_queue::BatchRevokeTask, tx_builder::RevokeTransactionBuilder,
};

/// Builder pattern for constructing a `BatchRevokeTask`.
///
/// The account and both submitters are required. Without a transaction builder, the EVM revoke
/// encoder over the bundled chain list (or `chains_file_path`) is used.
pub struct BatchRevokeTaskBuilder {
    account: Option<Account>,
    tx_builder: Option<Arc<dyn RevokeTransactionBuilder>>,
    direct_submitter: Option<Arc<dyn TransactionSubmitter>>,
    interactive_submitter: Option<Arc<dyn TransactionSubmitter>>,
    chains_file_path: Option<String>,
}

impl Default for BatchRevokeTaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRevokeTaskBuilder {
    pub fn new() -> Self {
        BatchRevokeTaskBuilder {
            account: None,
            tx_builder: None,
            direct_submitter: None,
            interactive_submitter: None,
            chains_file_path: None,
        }
    }

    pub fn account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    pub fn tx_builder(mut self, tx_builder: Arc<dyn RevokeTransactionBuilder>) -> Self {
        self.tx_builder = Some(tx_builder);
        self
    }

    /// Submitter for key-holding accounts, signing without user interaction.
    pub fn direct_submitter(mut self, submitter: Arc<dyn TransactionSubmitter>) -> Self {
        self.direct_submitter = Some(submitter);
        self
    }

    /// Submitter for hardware and remote accounts, where each transaction is confirmed by the
    /// user.
    pub fn interactive_submitter(mut self, submitter: Arc<dyn TransactionSubmitter>) -> Self {
        self.interactive_submitter = Some(submitter);
        self
    }

    /// Sets the `chains_file_path` manually.
    /// If it's not set, the bundled chain list will be used (config/chains.json)
    pub fn chains_file_path(mut self, chains_file_path: String) -> Self {
        self.chains_file_path = Some(chains_file_path);
        self
    }

    pub fn build(self) -> Result<BatchRevokeTask, ApprovalError> {
        let account = self.account.ok_or_else(|| {
            ApprovalError::FatalError("Please set the account before building the task".to_string())
        })?;
        let (Some(direct), Some(interactive)) = (self.direct_submitter, self.interactive_submitter)
        else {
            return Err(ApprovalError::FatalError(
                "Please set both submitters before building the task".to_string(),
            ));
        };
        let tx_builder = match self.tx_builder {
            Some(tx_builder) => tx_builder,
            None => default_tx_builder(self.chains_file_path)?,
        };
        BatchRevokeTask::new(account, tx_builder, direct, interactive)
    }
}

#[cfg(feature = "evm")]
fn default_tx_builder(
    chains_file_path: Option<String>,
) -> Result<Arc<dyn RevokeTransactionBuilder>, ApprovalError> {
    Ok(Arc::new(EvmRevokeTxBuilder::new(ChainRegistry::new(chains_file_path)?)))
}

#[cfg(not(feature = "evm"))]
fn default_tx_builder(
    _chains_file_path: Option<String>,
) -> Result<Arc<dyn RevokeTransactionBuilder>, ApprovalError> {
    Err(ApprovalError::FatalError(
        "Please set a transaction builder before building the task".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approvals::{
        fakes::{account, FakeSubmitter, FakeTxBuilder},
        models::AccountKind,
        task_queue::TaskStatus,
    };

    #[test]
    fn test_build_requires_account_and_submitters() {
        let submitter = Arc::new(FakeSubmitter::default());
        let missing_account = BatchRevokeTaskBuilder::new()
            .direct_submitter(submitter.clone())
            .interactive_submitter(submitter.clone())
            .build();
        assert!(matches!(missing_account, Err(ApprovalError::FatalError(_))));

        let missing_submitter = BatchRevokeTaskBuilder::new()
            .account(account(AccountKind::Ledger))
            .direct_submitter(submitter)
            .build();
        assert!(matches!(missing_submitter, Err(ApprovalError::FatalError(_))));
    }

    #[test]
    fn test_build_with_custom_tx_builder() {
        let submitter = Arc::new(FakeSubmitter::default());
        let task = BatchRevokeTaskBuilder::new()
            .account(account(AccountKind::SimpleKeyring))
            .tx_builder(Arc::new(FakeTxBuilder))
            .direct_submitter(submitter.clone())
            .interactive_submitter(submitter)
            .build()
            .unwrap();
        assert_eq!(task.status(), TaskStatus::Idle);
        assert_eq!(task.total_approvals(), 0);
    }

    #[cfg(feature = "evm")]
    #[test]
    fn test_build_with_bad_chains_file_fails() {
        let submitter = Arc::new(FakeSubmitter::default());
        let result = BatchRevokeTaskBuilder::new()
            .account(account(AccountKind::SimpleKeyring))
            .direct_submitter(submitter.clone())
            .interactive_submitter(submitter)
            .chains_file_path("does/not/exist.json".to_string())
            .build();
        assert!(matches!(result, Err(ApprovalError::FatalError(_))));
    }
}
