//! A single queued submission

use crate::crypto::keys::{Keypair, PublicId};
use crate::errors::{SeedKeepError, Result};
use crate::ledger::client::TransactionResult;
use crate::ledger::operations::{Memo, Operation};
use std::fmt;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Lifecycle of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Fulfilled,
    Rejected,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Queued => "queued",
            TaskState::Running => "running",
            TaskState::Fulfilled => "fulfilled",
            TaskState::Rejected => "rejected",
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, TaskState::Fulfilled | TaskState::Rejected)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations to submit from one account, plus the channel its caller
/// waits on. Runs at most once.
pub struct SubmissionTask {
    id: u64,
    keypair: Keypair,
    operations: Vec<Operation>,
    memo: Option<Memo>,
    state: TaskState,
    reply: Option<oneshot::Sender<Result<TransactionResult>>>,
}

impl SubmissionTask {
    /// Validate the inputs and build a queued task
    pub fn new(
        id: u64,
        keypair: Keypair,
        operations: Vec<Operation>,
        memo: Option<Memo>,
    ) -> Result<(Self, oneshot::Receiver<Result<TransactionResult>>)> {
        if operations.is_empty() {
            return Err(SeedKeepError::BadParameters(
                "operations must not be empty".to_string(),
            ));
        }
        for operation in &operations {
            operation.validate()?;
        }
        if let Some(memo) = &memo {
            memo.validate()?;
        }

        let (reply, receiver) = oneshot::channel();
        let task = Self {
            id,
            keypair,
            operations,
            memo,
            state: TaskState::Queued,
            reply: Some(reply),
        };
        Ok((task, receiver))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> PublicId {
        self.keypair.public_id()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn memo(&self) -> Option<&Memo> {
        self.memo.as_ref()
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn start(&mut self) {
        self.transition(TaskState::Running);
    }

    /// Record the outcome and hand it to the waiting caller
    ///
    /// A task settles once; later outcomes are logged and dropped.
    pub fn settle(&mut self, result: Result<TransactionResult>) {
        if self.state.is_settled() {
            warn!(
                "Task {} already {}, ignoring later outcome",
                self.id, self.state
            );
            return;
        }

        match &result {
            Ok(outcome) => {
                info!(
                    "Task {} for {} accepted as {}",
                    self.id,
                    self.source(),
                    outcome.hash
                );
                self.transition(TaskState::Fulfilled);
            }
            Err(e) => {
                warn!("Task {} for {} rejected: {}", self.id, self.source(), e);
                self.transition(TaskState::Rejected);
            }
        }

        if let Some(reply) = self.reply.take() {
            if reply.send(result).is_err() {
                debug!("Task {} settled after its caller went away", self.id);
            }
        }
    }

    fn transition(&mut self, next: TaskState) {
        debug!(
            "Task {} for {}: {} -> {}",
            self.id,
            self.source(),
            self.state,
            next
        );
        self.state = next;
    }
}

impl fmt::Debug for SubmissionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionTask")
            .field("id", &self.id)
            .field("source", &self.source())
            .field("operations", &self.operations.len())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Seed;

    fn keypair() -> Keypair {
        Keypair::from_seed(&Seed::from_bytes([3u8; 32]))
    }

    fn merge_op() -> Operation {
        Operation::account_merge(Keypair::from_seed(&Seed::from_bytes([4u8; 32])).public_id())
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let (mut task, receiver) = SubmissionTask::new(1, keypair(), vec![merge_op()], None).unwrap();
        assert_eq!(task.state(), TaskState::Queued);

        task.start();
        assert_eq!(task.state(), TaskState::Running);

        let outcome = TransactionResult {
            hash: "ab".to_string(),
            ledger: Some(3),
        };
        task.settle(Ok(outcome.clone()));
        assert_eq!(task.state(), TaskState::Fulfilled);
        assert!(task.state().is_settled());
        assert_eq!(receiver.await.unwrap().unwrap(), outcome);
    }

    #[tokio::test]
    async fn test_rejection_reaches_caller() {
        let (mut task, receiver) = SubmissionTask::new(2, keypair(), vec![merge_op()], None).unwrap();
        task.start();
        task.settle(Err(SeedKeepError::TransactionFailed("tx_bad_seq".to_string())));

        assert_eq!(task.state(), TaskState::Rejected);
        assert!(matches!(
            receiver.await.unwrap(),
            Err(SeedKeepError::TransactionFailed(_))
        ));
    }

    #[test]
    fn test_settle_without_caller() {
        let (mut task, receiver) = SubmissionTask::new(3, keypair(), vec![merge_op()], None).unwrap();
        drop(receiver);
        task.start();
        task.settle(Err(SeedKeepError::Timeout("gone".to_string())));
        assert_eq!(task.state(), TaskState::Rejected);
    }

    #[tokio::test]
    async fn test_second_outcome_ignored() {
        let (mut task, receiver) = SubmissionTask::new(6, keypair(), vec![merge_op()], None).unwrap();
        task.start();
        task.settle(Err(SeedKeepError::Timeout("slow".to_string())));
        task.settle(Ok(TransactionResult {
            hash: "cd".to_string(),
            ledger: Some(4),
        }));

        assert_eq!(task.state(), TaskState::Rejected);
        assert!(matches!(
            receiver.await.unwrap(),
            Err(SeedKeepError::Timeout(_))
        ));
    }

    #[test]
    fn test_inputs_validated() {
        assert!(matches!(
            SubmissionTask::new(4, keypair(), vec![], None),
            Err(SeedKeepError::BadParameters(_))
        ));

        let long_memo = Memo::Text("x".repeat(29));
        assert!(matches!(
            SubmissionTask::new(5, keypair(), vec![merge_op()], Some(long_memo)),
            Err(SeedKeepError::BadParameters(_))
        ));
    }
}
