//! Job Poller
//!
//! Two-phase schedule: one long initial wait (retrievals rarely finish in
//! under a few hours), then a fixed interval between status lookups.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::types::{JobDescription, JobHandle, JobStatus, PollError};
use crate::config::PollingConfig;
use crate::storage::JobDescriber;

/// Waits for a vault job to finish
#[async_trait]
pub trait PollingStrategy: Send + Sync {
    /// Returns `true` if the job succeeded, `false` if it failed or does not exist
    async fn wait_for_completion(&self, container_id: &str, job_id: &str) -> Result<bool, PollError>;

    async fn wait_for(&self, job: &JobHandle) -> Result<bool, PollError> {
        self.wait_for_completion(&job.container_id, &job.job_id).await
    }
}

/// Polls with an initial wait followed by a fixed interval
pub struct ScheduledPoller<D> {
    describer: Arc<D>,
    initial_wait: Duration,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<D: JobDescriber> ScheduledPoller<D> {
    pub fn new(describer: Arc<D>, config: &PollingConfig) -> Self {
        Self {
            describer,
            initial_wait: config.initial_wait,
            poll_interval: config.poll_interval,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_initial_wait(mut self, initial_wait: Duration) -> Self {
        self.initial_wait = initial_wait;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Cancelling `token` interrupts any wait in progress
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn describe(&self, container_id: &str, job_id: &str) -> Result<Option<JobDescription>, PollError> {
        self.describer
            .describe_job(container_id, job_id)
            .await
            .map_err(|source| PollError::Transport {
                job_id: job_id.to_string(),
                source,
            })
    }

    async fn sleep(&self, duration: Duration, job_id: &str) -> Result<(), PollError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!(job_id = %job_id, "Job wait cancelled");
                Err(PollError::Interrupted {
                    job_id: job_id.to_string(),
                })
            }
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

#[async_trait]
impl<D: JobDescriber> PollingStrategy for ScheduledPoller<D> {
    async fn wait_for_completion(&self, container_id: &str, job_id: &str) -> Result<bool, PollError> {
        if self.describe(container_id, job_id).await?.is_none() {
            tracing::info!(vault = %container_id, job_id = %job_id, "Job not found");
            return Ok(false);
        }

        self.sleep(self.initial_wait, job_id).await?;

        let status = loop {
            match self.describe(container_id, job_id).await? {
                Some(job) if job.status_code == JobStatus::InProgress => {
                    tracing::debug!(
                        job_id = %job_id,
                        retry_in_secs = self.poll_interval.as_secs(),
                        "Job still in progress"
                    );
                    self.sleep(self.poll_interval, job_id).await?;
                }
                Some(job) => break Some(job.status_code),
                None => break None,
            }
        };

        tracing::info!(
            vault = %container_id,
            job_id = %job_id,
            status = ?status,
            "Job finished"
        );

        Ok(status == Some(JobStatus::Succeeded))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use chrono::Utc;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use crate::jobs::JobAction;
    use crate::storage::StorageError;

    const HOUR: Duration = Duration::from_secs(3600);
    const QUARTER_HOUR: Duration = Duration::from_secs(900);

    /// Answers describe calls from a script and records when they happened
    struct ScriptedJobs {
        script: Mutex<VecDeque<Result<Option<JobStatus>, String>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedJobs {
        fn new(script: Vec<Result<Option<JobStatus>, String>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl JobDescriber for ScriptedJobs {
        async fn describe_job(
            &self,
            _container_id: &str,
            job_id: &str,
        ) -> Result<Option<JobDescription>, StorageError> {
            self.calls.lock().push(Instant::now());
            let next = self
                .script
                .lock()
                .pop_front()
                .expect("describe called more often than scripted");

            next.map(|status| {
                status.map(|status_code| JobDescription {
                    job_id: job_id.to_string(),
                    action: JobAction::InventoryRetrieval,
                    status_code,
                    status_message: None,
                    archive_id: None,
                    creation_date: Utc::now(),
                    completion_date: None,
                    completed: status_code.is_terminal(),
                })
            })
            .map_err(StorageError::Transport)
        }
    }

    fn poller(jobs: &Arc<ScriptedJobs>) -> ScheduledPoller<ScriptedJobs> {
        ScheduledPoller::new(jobs.clone(), &PollingConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_job_returns_without_sleeping() {
        let jobs = ScriptedJobs::new(vec![Ok(None)]);
        let start = Instant::now();

        let succeeded = poller(&jobs).wait_for_completion("vault", "job").await.unwrap();

        assert!(!succeeded);
        assert_eq!(jobs.call_times().len(), 1);
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_phase_schedule() {
        let jobs = ScriptedJobs::new(vec![
            Ok(Some(JobStatus::InProgress)),
            Ok(Some(JobStatus::InProgress)),
            Ok(Some(JobStatus::InProgress)),
            Ok(Some(JobStatus::Succeeded)),
        ]);
        let start = Instant::now();

        let succeeded = poller(&jobs).wait_for_completion("vault", "job").await.unwrap();
        assert!(succeeded);

        let offsets: Vec<Duration> = jobs.call_times().iter().map(|t| *t - start).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                3 * HOUR,
                3 * HOUR + QUARTER_HOUR,
                3 * HOUR + 2 * QUARTER_HOUR,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_initially_even_when_already_done() {
        let jobs = ScriptedJobs::new(vec![
            Ok(Some(JobStatus::Succeeded)),
            Ok(Some(JobStatus::Succeeded)),
        ]);
        let start = Instant::now();

        let poller = poller(&jobs).with_initial_wait(Duration::from_secs(60));
        assert!(poller.wait_for(&JobHandle::new("vault", "job")).await.unwrap());
        assert_eq!(Instant::now() - start, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_and_vanished_jobs() {
        let jobs = ScriptedJobs::new(vec![
            Ok(Some(JobStatus::InProgress)),
            Ok(Some(JobStatus::Failed)),
        ]);
        assert!(!poller(&jobs).wait_for_completion("vault", "job").await.unwrap());

        let jobs = ScriptedJobs::new(vec![Ok(Some(JobStatus::InProgress)), Ok(None)]);
        assert!(!poller(&jobs).wait_for_completion("vault", "job").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_failure_propagates() {
        let jobs = ScriptedJobs::new(vec![
            Ok(Some(JobStatus::InProgress)),
            Err("connection reset".to_string()),
        ]);

        let result = poller(&jobs).wait_for_completion("vault", "job").await;
        assert!(matches!(
            result,
            Err(PollError::Transport {
                source: StorageError::Transport(_),
                ..
            })
        ));
        assert_eq!(jobs.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let jobs = ScriptedJobs::new(vec![Ok(Some(JobStatus::InProgress))]);
        let poller = poller(&jobs);
        let token = poller.cancellation_token();
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(HOUR).await;
            token.cancel();
        });

        let result = poller.wait_for_completion("vault", "job").await;
        assert!(matches!(result, Err(PollError::Interrupted { .. })));
        assert_eq!(Instant::now() - start, HOUR);
        assert_eq!(jobs.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let jobs = ScriptedJobs::new(vec![Ok(Some(JobStatus::InProgress))]);
        let token = CancellationToken::new();
        token.cancel();

        let poller = poller(&jobs)
            .with_poll_interval(Duration::from_secs(1))
            .with_cancellation(token);
        let result = poller.wait_for_completion("vault", "job").await;
        assert!(matches!(result, Err(PollError::Interrupted { .. })));
    }
}
