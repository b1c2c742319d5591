//! Execution collaborator seam
//!
//! The scheduler never runs commands itself. Every emitted [`CheckJob`] is
//! handed to a [`CheckExecutor`]; the result comes back later through
//! [`super::scheduler::SchedulerHandle::submit_result`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use crate::check::CheckJob;

/// Something that can start checks
///
/// A failed launch is reported by the scheduler as an UNKNOWN result.
#[async_trait]
pub trait CheckExecutor: Send + Sync {
    async fn launch(&self, job: CheckJob) -> Result<()>;
}

/// Forwards jobs into a channel, for workers living in the same process
#[derive(Clone)]
pub struct ChannelExecutor {
    sender: mpsc::Sender<CheckJob>,
}

impl ChannelExecutor {
    pub fn new(sender: mpsc::Sender<CheckJob>) -> Self {
        Self { sender }
    }

    /// Executor plus the receiving end of its job queue
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CheckJob>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl CheckExecutor for ChannelExecutor {
    async fn launch(&self, job: CheckJob) -> Result<()> {
        trace!("queueing {} for {}", job.check_id, job.item);
        self.sender
            .send(job)
            .await
            .context("job queue closed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckId;
    use chrono::Utc;

    fn create_test_job(id: u64) -> CheckJob {
        CheckJob {
            check_id: CheckId(id),
            item: "web1".to_string(),
            command: "check_ping".to_string(),
            scheduled_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_channel_executor_forwards_jobs() {
        let (executor, mut jobs) = ChannelExecutor::channel(4);
        executor.launch(create_test_job(1)).await.unwrap();

        let job = jobs.recv().await.unwrap();
        assert_eq!(job.check_id, CheckId(1));
    }

    #[tokio::test]
    async fn test_closed_queue_fails_launch() {
        let (executor, jobs) = ChannelExecutor::channel(4);
        drop(jobs);

        assert!(executor.launch(create_test_job(2)).await.is_err());
    }
}
