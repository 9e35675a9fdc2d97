//! Per-identity submission lanes
//!
//! An account's sequence number is a single counter, and the network
//! rejects transactions that reuse or skip it. Every identity therefore
//! gets one lane that fetches, builds, signs and submits strictly one
//! task at a time. Lanes of different identities run independently.

use crate::config::{NetworkConfig, SubmissionConfig};
use crate::crypto::keys::{Identity, PublicId};
use crate::errors::{SeedKeepError, Result};
use crate::ledger::client::{with_timeout, LedgerClient, TransactionResult};
use crate::ledger::envelope::{NetworkId, TransactionEnvelope};
use crate::ledger::operations::{Memo, Operation};
use crate::submission::task::SubmissionTask;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Sending half of a running lane
struct Lane {
    sender: mpsc::UnboundedSender<SubmissionTask>,
    worker: Option<JoinHandle<()>>,
}

/// Everything a lane worker needs, shared by all lanes
struct LaneContext {
    ledger: Arc<dyn LedgerClient>,
    network: NetworkId,
    call_timeout: Duration,
}

/// Registry of submission lanes, keyed by source identity
pub struct SubmissionQueue {
    context: Arc<LaneContext>,
    lanes: DashMap<PublicId, Lane>,
    /// Workers of reset lanes that may still be draining; a new lane for
    /// the same identity waits for them before running anything
    retired: DashMap<PublicId, JoinHandle<()>>,
    next_task_id: AtomicU64,
}

impl SubmissionQueue {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        network: &NetworkConfig,
        submission: &SubmissionConfig,
    ) -> Self {
        Self {
            context: Arc::new(LaneContext {
                ledger,
                network: NetworkId::from_passphrase(&network.passphrase),
                call_timeout: submission.call_timeout(),
            }),
            lanes: DashMap::new(),
            retired: DashMap::new(),
            next_task_id: AtomicU64::new(1),
        }
    }

    /// Queue `operations` on the lane of `source`
    ///
    /// Inputs are validated and the task is enqueued before this returns,
    /// so tasks from one caller run in call order whether or not the
    /// returned futures are polled. Dropping the future does not cancel
    /// the task.
    pub fn submit(
        &self,
        source: &Identity,
        operations: Vec<Operation>,
        memo: Option<Memo>,
    ) -> BoxFuture<'static, Result<TransactionResult>> {
        let enqueued = self.enqueue(source, operations, memo);

        async move {
            let reply = enqueued?;
            reply.await.map_err(|_| {
                SeedKeepError::InternalError("Submission lane stopped before settling".to_string())
            })?
        }
        .boxed()
    }

    /// Number of live lanes
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Drop every lane
    ///
    /// Tasks already handed to a lane still run. The next submission for
    /// an identity starts a fresh lane, which holds its tasks back until
    /// the old lane has drained.
    pub fn reset(&self) {
        self.retired.retain(|_, worker| !worker.is_finished());

        let ids: Vec<PublicId> = self.lanes.iter().map(|lane| *lane.key()).collect();
        let mut dropped = 0;
        for id in ids {
            if let Entry::Occupied(mut entry) = self.lanes.entry(id) {
                if let Some(worker) = entry.get_mut().worker.take() {
                    if !worker.is_finished() {
                        self.retired.insert(id, worker);
                    }
                }
                entry.remove();
                dropped += 1;
            }
        }

        info!(
            "Submission lanes reset ({} dropped, {} still draining)",
            dropped,
            self.retired.len()
        );
    }

    fn enqueue(
        &self,
        source: &Identity,
        operations: Vec<Operation>,
        memo: Option<Memo>,
    ) -> Result<oneshot::Receiver<Result<TransactionResult>>> {
        let keypair = source.require_keypair()?.clone();
        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let (task, reply) = SubmissionTask::new(id, keypair, operations, memo)?;
        let source_id = task.source();

        // The entry holds the shard lock, so concurrent first uses of one
        // identity see a single lane.
        let lane = match self.lanes.entry(source_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().sender.is_closed() {
                    entry.insert(self.spawn_lane(source_id)?);
                }
                entry.into_ref()
            }
            Entry::Vacant(entry) => entry.insert(self.spawn_lane(source_id)?),
        };

        lane.sender.send(task).map_err(|_| {
            SeedKeepError::InternalError(format!("Lane for {} is closed", source_id))
        })?;
        debug!("Task {} queued for {}", id, source_id);

        Ok(reply)
    }

    fn spawn_lane(&self, source: PublicId) -> Result<Lane> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SeedKeepError::InternalError(format!("No async runtime for submission lane: {}", e))
        })?;

        // Called under the lane entry lock, which reset also takes before
        // retiring a worker
        let predecessor = self.retired.remove(&source).map(|(_, worker)| worker);

        let (sender, receiver) = mpsc::unbounded_channel();
        let context = Arc::clone(&self.context);
        let worker = runtime.spawn(run_lane(source, receiver, context, predecessor));

        debug!("Started submission lane for {}", source);
        Ok(Lane {
            sender,
            worker: Some(worker),
        })
    }
}

/// Drain one lane until every sender is gone
async fn run_lane(
    source: PublicId,
    mut receiver: mpsc::UnboundedReceiver<SubmissionTask>,
    context: Arc<LaneContext>,
    predecessor: Option<JoinHandle<()>>,
) {
    if let Some(previous) = predecessor {
        if previous.await.is_err() {
            debug!("Previous lane for {} ended abnormally", source);
        }
    }

    while let Some(mut task) = receiver.recv().await {
        task.start();
        let result = execute(&task, &context).await;
        task.settle(result);
    }

    debug!("Submission lane for {} closed", source);
}

/// Fetch, build, sign and submit one task
async fn execute(task: &SubmissionTask, context: &LaneContext) -> Result<TransactionResult> {
    let source = task.source();
    let timeout = context.call_timeout;

    let account = with_timeout(timeout, "account fetch", context.ledger.get_account(&source)).await?;

    let envelope = TransactionEnvelope::new(
        source,
        account.sequence,
        task.operations().to_vec(),
        task.memo().cloned(),
    )?;
    let signed = envelope.sign(task.keypair(), &context.network)?;
    debug!(
        "Submitting {} for {} at sequence {}",
        signed.hash, source, signed.envelope.sequence
    );

    with_timeout(
        timeout,
        "transaction submission",
        context.ledger.submit_transaction(&signed),
    )
    .await
    .map_err(|e| match e {
        SeedKeepError::TransactionFailed(_) | SeedKeepError::Timeout(_) => e,
        other => SeedKeepError::TransactionFailed(other.to_string()),
    })
}
