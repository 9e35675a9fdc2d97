//! Submission serializer
//!
//! Transactions from one source identity are built, signed and submitted
//! strictly one after another, in the order they were queued.

pub mod queue;
pub mod task;

pub use queue::SubmissionQueue;
pub use task::{SubmissionTask, TaskState};
