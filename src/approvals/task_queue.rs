use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::{
    runtime::{Handle, Runtime},
    sync::watch,
};
use tracing::{debug, info, warn};

use crate::approvals::{
    constants::{DEFAULT_JOB_PRIORITY, RETRY_JOB_PRIORITY},
    errors::{ApprovalError, FailedCode},
    identity::SelectionKey,
    models::Account,
    selection::{RevokeGrant, SelectionMap},
    submitter::{
        GasCost, SubmitError, SubmitEvent, SubmitOptions, SubmitReceipt, TransactionSubmitter,
    },
    tx_builder::RevokeTransactionBuilder,
    utils::get_runtime,
};

/// Lifecycle of a batch-revoke run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Idle,
    Active,
    Paused,
    Completed,
}

/// Progress of the transaction currently going out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    #[default]
    Idle,
    Sent,
    Signed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RevokeStatus {
    Pending {
        is_gas_account: bool,
    },
    Fail {
        failed_code: FailedCode,
        failed_reason: String,
        gas_cost: Option<GasCost>,
    },
    Success {
        tx_hash: String,
        gas_cost: Option<GasCost>,
        completed_at: DateTime<Utc>,
    },
}

/// A selected grant and the outcome of its revoke. `status` is `None` until the item is picked
/// up.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchRevokeTaskItem {
    pub grant: RevokeGrant,
    pub status: Option<RevokeStatus>,
}

impl BatchRevokeTaskItem {
    pub fn key(&self) -> &SelectionKey {
        &self.grant.key
    }
}

#[derive(Debug)]
struct Job {
    priority: i32,
    seq: u64,
    generation: u64,
    grant: RevokeGrant,
    ignore_gas_check: bool,
}

impl Job {
    fn rank(&self) -> (i32, Reverse<u64>) {
        (self.priority, Reverse(self.seq))
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Max-heap: higher priority first, then earlier insertion.
impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[derive(Default)]
struct QueueState {
    status: TaskStatus,
    tx_status: TxStatus,
    list: Vec<BatchRevokeTaskItem>,
    revoke_items: SelectionMap,
    jobs: BinaryHeap<Job>,
    next_seq: u64,
    /// Bumped by `init`; results of jobs from an earlier run are dropped.
    generation: u64,
    paused: bool,
    /// A worker is alive. There is never more than one.
    running: bool,
    /// The job in flight, cleared once its outcome is recorded.
    current: Option<RevokeGrant>,
}

impl QueueState {
    fn set_item_status(&mut self, generation: u64, key: &SelectionKey, status: RevokeStatus) {
        if generation != self.generation {
            return;
        }
        if let Some(item) = self
            .list
            .iter_mut()
            .find(|item| item.key() == key)
        {
            item.status = Some(status);
        }
    }
}

struct TaskInner {
    account: Account,
    tx_builder: Arc<dyn RevokeTransactionBuilder>,
    direct_submitter: Arc<dyn TransactionSubmitter>,
    interactive_submitter: Arc<dyn TransactionSubmitter>,
    state: Mutex<QueueState>,
    status_tx: watch::Sender<TaskStatus>,
    busy_tx: watch::Sender<bool>,
}

impl TaskInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, state: &mut QueueState, status: TaskStatus) {
        if state.status != status {
            debug!(from = ?state.status, to = ?status, "Batch revoke status changed");
        }
        state.status = status;
        self.status_tx.send_replace(status);
    }
}

/// Sequential queue revoking a batch of selected grants, one transaction at a time.
///
/// Jobs run strictly one after another so transactions of the same account never race for a
/// nonce. Higher priority jobs run first; equal priorities run in insertion order. Pausing stops
/// the next dequeue but never aborts the job in flight.
pub struct BatchRevokeTask {
    inner: Arc<TaskInner>,
    runtime_handle: Handle,
    // Keeps a runtime created by `get_runtime` alive when none existed.
    #[allow(dead_code)]
    runtime: Option<Arc<Runtime>>,
}

impl BatchRevokeTask {
    pub fn new(
        account: Account,
        tx_builder: Arc<dyn RevokeTransactionBuilder>,
        direct_submitter: Arc<dyn TransactionSubmitter>,
        interactive_submitter: Arc<dyn TransactionSubmitter>,
    ) -> Result<Self, ApprovalError> {
        let (runtime_handle, runtime) = get_runtime()?;
        let (status_tx, _) = watch::channel(TaskStatus::Idle);
        let (busy_tx, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(TaskInner {
                account,
                tx_builder,
                direct_submitter,
                interactive_submitter,
                state: Mutex::new(QueueState::default()),
                status_tx,
                busy_tx,
            }),
            runtime_handle,
            runtime,
        })
    }

    /// Loads a new run: clears pending jobs, resets every item and returns to `Idle`. A job
    /// still in flight from the previous run finishes, but its outcome is discarded.
    pub fn init(&self, dataset: Vec<RevokeGrant>, revoke_items: SelectionMap) {
        let mut state = self.inner.lock();
        state.jobs.clear();
        state.generation += 1;
        state.list = dataset
            .into_iter()
            .map(|grant| BatchRevokeTaskItem { grant, status: None })
            .collect();
        state.revoke_items = revoke_items;
        state.paused = false;
        state.current = None;
        state.tx_status = TxStatus::Idle;
        self.inner
            .set_status(&mut state, TaskStatus::Idle);
        info!(items = state.list.len(), "Batch revoke initialised");
    }

    /// Enqueues every item at the default priority.
    pub fn start(&self) {
        let mut state = self.inner.lock();
        state.paused = false;
        self.inner
            .set_status(&mut state, TaskStatus::Active);
        let grants: Vec<RevokeGrant> = state
            .list
            .iter()
            .map(|item| item.grant.clone())
            .collect();
        for grant in grants {
            push_job(&mut state, grant, DEFAULT_JOB_PRIORITY, false);
        }
        info!(jobs = state.jobs.len(), "Batch revoke started");
        self.ensure_worker(&mut state);
    }

    /// Enqueues one grant. Priority `0` jumps ahead of the default `-1` jobs; set
    /// `ignore_gas_check` to resubmit an item that failed with `GasTooHigh`.
    pub fn add_revoke_task(&self, grant: RevokeGrant, priority: i32, ignore_gas_check: bool) {
        let mut state = self.inner.lock();
        push_job(&mut state, grant, priority, ignore_gas_check);
        self.ensure_worker(&mut state);
    }

    pub fn pause(&self) {
        let mut state = self.inner.lock();
        state.paused = true;
        self.inner
            .set_status(&mut state, TaskStatus::Paused);
        info!("Batch revoke paused");
    }

    pub fn resume(&self) {
        let mut state = self.inner.lock();
        state.paused = false;
        self.inner
            .set_status(&mut state, TaskStatus::Active);
        info!("Batch revoke resumed");
        self.ensure_worker(&mut state);
    }

    /// Re-enqueues the item in flight, at the front of the queue. Does nothing between jobs.
    pub fn reset_current(&self) {
        let current = self.inner.lock().current.clone();
        if let Some(grant) = current {
            self.add_revoke_task(grant, RETRY_JOB_PRIORITY, false);
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.lock().status
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn tx_status(&self) -> TxStatus {
        self.inner.lock().tx_status
    }

    pub fn list(&self) -> Vec<BatchRevokeTaskItem> {
        self.inner.lock().list.clone()
    }

    pub fn total_approvals(&self) -> usize {
        self.inner.lock().revoke_items.len()
    }

    pub fn revoked_approvals(&self) -> usize {
        self.inner
            .lock()
            .list
            .iter()
            .filter(|item| matches!(item.status, Some(RevokeStatus::Success { .. })))
            .count()
    }

    /// Index of the item being revoked, if any.
    pub fn current_approval_index(&self) -> Option<usize> {
        self.inner
            .lock()
            .list
            .iter()
            .position(|item| matches!(item.status, Some(RevokeStatus::Pending { .. })))
    }

    /// Resolves once no worker is running: every job is done, or the queue is paused and the job
    /// in flight has finished.
    pub async fn wait_idle(&self) {
        let mut busy = self.inner.busy_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = busy.wait_for(|busy| !*busy).await;
    }

    fn ensure_worker(&self, state: &mut QueueState) {
        if state.running || state.paused {
            return;
        }
        state.running = true;
        self.inner.busy_tx.send_replace(true);
        self.runtime_handle
            .spawn(run_worker(self.inner.clone()));
    }
}

fn push_job(state: &mut QueueState, grant: RevokeGrant, priority: i32, ignore_gas_check: bool) {
    let seq = state.next_seq;
    state.next_seq += 1;
    let generation = state.generation;
    state
        .jobs
        .push(Job { priority, seq, generation, grant, ignore_gas_check });
}

async fn run_worker(inner: Arc<TaskInner>) {
    loop {
        let job = {
            let mut state = inner.lock();
            if state.jobs.is_empty() {
                state.running = false;
                if state.status != TaskStatus::Idle {
                    inner.set_status(&mut state, TaskStatus::Completed);
                    info!("Batch revoke completed");
                }
                inner.busy_tx.send_replace(false);
                return;
            }
            if state.paused {
                state.running = false;
                inner.busy_tx.send_replace(false);
                return;
            }
            let Some(job) = state.jobs.pop() else {
                continue;
            };
            state.current = Some(job.grant.clone());
            state.set_item_status(
                job.generation,
                &job.grant.key,
                RevokeStatus::Pending { is_gas_account: false },
            );
            job
        };

        // A panicking collaborator fails its own item; the worker carries on with the rest.
        let result = AssertUnwindSafe(revoke(&inner, &job))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(SubmitError::Other(format!("Revoke of {} panicked", job.grant.key)))
            });

        let mut state = inner.lock();
        state.tx_status = TxStatus::Idle;
        if job.generation == state.generation {
            state.current = None;
        }
        let status = match result {
            Ok(receipt) => {
                info!(key = %job.grant.key, tx_hash = %receipt.tx_hash, "Revoked approval");
                RevokeStatus::Success {
                    tx_hash: receipt.tx_hash,
                    gas_cost: receipt.gas_cost,
                    completed_at: Utc::now(),
                }
            }
            Err(err) => {
                warn!(key = %job.grant.key, error = %err, "Failed to revoke approval");
                if matches!(err, SubmitError::UserCancelled) && job.generation == state.generation {
                    state.paused = true;
                    inner.set_status(&mut state, TaskStatus::Paused);
                }
                RevokeStatus::Fail {
                    failed_code: err.failed_code(),
                    failed_reason: err.to_string(),
                    gas_cost: err.gas_cost().cloned(),
                }
            }
        };
        state.set_item_status(job.generation, &job.grant.key, status);
    }
}

async fn revoke(inner: &TaskInner, job: &Job) -> Result<SubmitReceipt, SubmitError> {
    let item = inner
        .lock()
        .revoke_items
        .get(&job.grant.key)
        .cloned()
        .ok_or_else(|| SubmitError::Other(format!("No revoke item for {}", job.grant.key)))?;

    let tx = inner
        .tx_builder
        .build(&item, &inner.account)
        .await
        .map_err(|e| SubmitError::Other(e.to_string()))?;

    let on_event = |event: SubmitEvent| {
        let mut state = inner.lock();
        if job.generation != state.generation {
            return;
        }
        match event {
            SubmitEvent::Built => state.tx_status = TxStatus::Sent,
            SubmitEvent::Signed => state.tx_status = TxStatus::Signed,
            SubmitEvent::UsingGasAccount => state.set_item_status(
                job.generation,
                &job.grant.key,
                RevokeStatus::Pending { is_gas_account: true },
            ),
        }
    };

    if inner.account.kind.supports_direct_signing() {
        let options =
            SubmitOptions { ignore_gas_check: job.ignore_gas_check, use_gas_account: true };
        inner
            .direct_submitter
            .submit(&tx, &inner.account, options, &on_event)
            .await
    } else {
        let options =
            SubmitOptions { ignore_gas_check: job.ignore_gas_check, use_gas_account: false };
        inner
            .interactive_submitter
            .submit(&tx, &inner.account, options, &on_event)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::approvals::{
        fakes::{account, revoke_batch, FakeSubmitter, FakeTxBuilder},
        models::{AccountKind, RevokeItem, Transaction},
    };

    /// Panics while building the revoke for one spender, delegates otherwise.
    struct PanickingTxBuilder {
        spender: &'static str,
    }

    #[async_trait]
    impl RevokeTransactionBuilder for PanickingTxBuilder {
        async fn build(
            &self,
            item: &RevokeItem,
            account: &Account,
        ) -> Result<Transaction, ApprovalError> {
            if item.spender == self.spender {
                panic!("cannot encode revoke for {}", item.spender);
            }
            FakeTxBuilder.build(item, account).await
        }
    }

    fn task(kind: AccountKind, direct: &FakeSubmitter, interactive: &FakeSubmitter) -> BatchRevokeTask {
        BatchRevokeTask::new(
            account(kind),
            Arc::new(FakeTxBuilder::default()),
            Arc::new(direct.clone()),
            Arc::new(interactive.clone()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_runs_every_item_to_completion() {
        let submitter = FakeSubmitter::default();
        let task = task(AccountKind::SimpleKeyring, &submitter, &FakeSubmitter::default());
        let batch = revoke_batch(&["0xa", "0xb", "0xc"]);
        task.init(batch.dataset, batch.revoke_items);
        assert_eq!(task.status(), TaskStatus::Idle);
        assert_eq!(task.total_approvals(), 3);

        let mut status_rx = task.subscribe();
        task.start();
        task.wait_idle().await;

        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(*status_rx.borrow_and_update(), TaskStatus::Completed);
        assert_eq!(task.revoked_approvals(), 3);
        assert_eq!(task.current_approval_index(), None);
        assert_eq!(task.tx_status(), TxStatus::Idle);
        assert_eq!(submitter.spenders(), vec!["0xa", "0xb", "0xc"]);
        assert!(submitter
            .calls()
            .iter()
            .all(|c| c.options.use_gas_account));
    }

    #[tokio::test]
    async fn test_higher_priority_runs_first() {
        let submitter = FakeSubmitter::default();
        let task = task(AccountKind::SimpleKeyring, &submitter, &FakeSubmitter::default());
        let batch = revoke_batch(&["0xj1", "0xj2", "0xj3"]);
        task.init(batch.dataset.clone(), batch.revoke_items);

        task.pause();
        task.add_revoke_task(batch.dataset[0].clone(), DEFAULT_JOB_PRIORITY, false);
        task.add_revoke_task(batch.dataset[1].clone(), DEFAULT_JOB_PRIORITY, false);
        task.add_revoke_task(batch.dataset[2].clone(), RETRY_JOB_PRIORITY, false);
        task.resume();
        task.wait_idle().await;

        assert_eq!(submitter.spenders(), vec!["0xj3", "0xj1", "0xj2"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_two_submissions_in_flight() {
        let submitter = FakeSubmitter::default().with_delay(Duration::from_millis(5));
        let task = task(AccountKind::HdKeyring, &submitter, &FakeSubmitter::default());
        let spenders: Vec<String> = (0..8).map(|i| format!("0x{i}")).collect();
        let refs: Vec<&str> = spenders.iter().map(String::as_str).collect();
        let batch = revoke_batch(&refs);
        task.init(batch.dataset.clone(), batch.revoke_items);
        task.start();
        for grant in batch.dataset.iter().take(3) {
            task.add_revoke_task(grant.clone(), RETRY_JOB_PRIORITY, false);
        }
        task.wait_idle().await;

        assert_eq!(submitter.calls().len(), 11);
        assert_eq!(submitter.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_pause_during_job_leaves_rest_untouched() {
        let submitter = FakeSubmitter::default();
        let gate = submitter.gate("0xa");
        let task = task(AccountKind::SimpleKeyring, &submitter, &FakeSubmitter::default());
        let batch = revoke_batch(&["0xa", "0xb"]);
        task.init(batch.dataset, batch.revoke_items);
        task.start();

        gate.entered.notified().await;
        assert_eq!(task.current_approval_index(), Some(0));
        task.pause();
        gate.release.notify_one();
        task.wait_idle().await;

        let list = task.list();
        assert!(matches!(list[0].status, Some(RevokeStatus::Success { .. })));
        assert_eq!(list[1].status, None);
        assert_eq!(task.status(), TaskStatus::Paused);

        task.resume();
        task.wait_idle().await;
        assert_eq!(task.revoked_approvals(), 2);
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_gas_too_high_then_override() {
        let submitter = FakeSubmitter::default();
        submitter.fail_next("0xa", SubmitError::GasTooHigh {
            gas_cost: FakeSubmitter::gas_cost(42.0),
            limit_usd: 20.0,
        });
        let task = task(AccountKind::SimpleKeyring, &submitter, &FakeSubmitter::default());
        let batch = revoke_batch(&["0xa"]);
        task.init(batch.dataset.clone(), batch.revoke_items);
        task.start();
        task.wait_idle().await;

        match &task.list()[0].status {
            Some(RevokeStatus::Fail { failed_code, gas_cost, .. }) => {
                assert_eq!(*failed_code, FailedCode::GasTooHigh);
                assert_eq!(gas_cost.as_ref().map(|c| c.usd_value), Some(42.0));
            }
            other => panic!("unexpected status {other:?}"),
        }

        task.add_revoke_task(batch.dataset[0].clone(), RETRY_JOB_PRIORITY, true);
        task.wait_idle().await;

        let calls = submitter.calls();
        assert_eq!(calls.len(), 2);
        assert!(!calls[0].options.ignore_gas_check);
        assert!(calls[1].options.ignore_gas_check);
        assert!(matches!(task.list()[0].status, Some(RevokeStatus::Success { .. })));
    }

    #[tokio::test]
    async fn test_user_cancel_pauses_queue() {
        let interactive = FakeSubmitter::default();
        interactive.fail_next("0xa", SubmitError::UserCancelled);
        let direct = FakeSubmitter::default();
        let task = task(AccountKind::Ledger, &direct, &interactive);
        let batch = revoke_batch(&["0xa", "0xb"]);
        task.init(batch.dataset, batch.revoke_items);
        task.start();
        task.wait_idle().await;

        let list = task.list();
        assert!(matches!(
            list[0].status,
            Some(RevokeStatus::Fail { failed_code: FailedCode::SubmitTxFailed, .. })
        ));
        assert_eq!(list[1].status, None);
        assert_eq!(task.status(), TaskStatus::Paused);
        assert!(direct.calls().is_empty());
        assert!(!interactive.calls()[0].options.use_gas_account);
    }

    #[tokio::test]
    async fn test_missing_revoke_item_fails_item_only() {
        let submitter = FakeSubmitter::default();
        let task = task(AccountKind::SimpleKeyring, &submitter, &FakeSubmitter::default());
        let mut batch = revoke_batch(&["0xa", "0xb"]);
        let first_key = batch.dataset[0].key.clone();
        batch.revoke_items.remove(&first_key);
        task.init(batch.dataset, batch.revoke_items);
        task.start();
        task.wait_idle().await;

        let list = task.list();
        assert!(matches!(
            list[0].status,
            Some(RevokeStatus::Fail { failed_code: FailedCode::DefaultFailed, .. })
        ));
        assert!(matches!(list[1].status, Some(RevokeStatus::Success { .. })));
        assert_eq!(submitter.spenders(), vec!["0xb"]);
    }

    #[tokio::test]
    async fn test_gas_account_flag_and_reset_current() {
        let submitter = FakeSubmitter::default().with_gas_account();
        let gate = submitter.gate("0xa");
        let task = task(AccountKind::SimpleKeyring, &submitter, &FakeSubmitter::default());
        let batch = revoke_batch(&["0xa"]);
        task.init(batch.dataset, batch.revoke_items);
        task.start();

        gate.entered.notified().await;
        assert_eq!(
            task.list()[0].status,
            Some(RevokeStatus::Pending { is_gas_account: true })
        );
        assert_eq!(task.tx_status(), TxStatus::Signed);
        task.reset_current();
        gate.release.notify_one();
        task.wait_idle().await;

        assert_eq!(submitter.spenders(), vec!["0xa", "0xa"]);
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_init_discards_previous_run() {
        let submitter = FakeSubmitter::default();
        let gate = submitter.gate("0xa");
        let task = task(AccountKind::SimpleKeyring, &submitter, &FakeSubmitter::default());
        let batch = revoke_batch(&["0xa", "0xb"]);
        task.init(batch.dataset.clone(), batch.revoke_items.clone());
        task.start();
        gate.entered.notified().await;

        task.init(batch.dataset, batch.revoke_items);
        gate.release.notify_one();
        task.wait_idle().await;

        assert_eq!(task.status(), TaskStatus::Idle);
        assert!(task.list().iter().all(|item| item.status.is_none()));
        assert_eq!(submitter.spenders(), vec!["0xa"]);
    }

    #[tokio::test]
    async fn test_panicking_job_fails_item_and_queue_continues() {
        let submitter = FakeSubmitter::default();
        let task = BatchRevokeTask::new(
            account(AccountKind::SimpleKeyring),
            Arc::new(PanickingTxBuilder { spender: "0xa" }),
            Arc::new(submitter.clone()),
            Arc::new(FakeSubmitter::default()),
        )
        .unwrap();
        let batch = revoke_batch(&["0xa", "0xb"]);
        task.init(batch.dataset, batch.revoke_items);
        task.start();
        task.wait_idle().await;

        let list = task.list();
        assert!(matches!(
            list[0].status,
            Some(RevokeStatus::Fail { failed_code: FailedCode::DefaultFailed, .. })
        ));
        assert!(matches!(list[1].status, Some(RevokeStatus::Success { .. })));
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(submitter.spenders(), vec!["0xb"]);

        // The worker is free again for later jobs.
        task.add_revoke_task(task.list()[1].grant.clone(), RETRY_JOB_PRIORITY, false);
        task.wait_idle().await;
        assert_eq!(submitter.spenders(), vec!["0xb", "0xb"]);
    }

    #[tokio::test]
    async fn test_reset_current_after_completion_is_noop() {
        let submitter = FakeSubmitter::default();
        let task = task(AccountKind::SimpleKeyring, &submitter, &FakeSubmitter::default());
        let batch = revoke_batch(&["0xa"]);
        task.init(batch.dataset, batch.revoke_items);
        task.start();
        task.wait_idle().await;

        task.reset_current();
        task.wait_idle().await;
        assert_eq!(submitter.spenders(), vec!["0xa"]);
        assert_eq!(task.revoked_approvals(), 1);
    }
}
