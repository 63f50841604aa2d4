use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::time::sleep;

use crate::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_RETRIES, ProviderBox,
    cancel::CancelToken,
    error::GenerationError,
    provider::{MediaRef, MediaResult, VIDEO_MIME},
    request::GenerationRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Pending,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

/// One in-flight video generation. Created only by a successful submit and
/// owned by the driver until it returns control to the caller. A job never
/// leaves a terminal state.
#[derive(Debug)]
pub struct Job {
    pub id: String,
    pub state: JobState,
    pub attempts: u32,
    pub created_at: Instant,
    api_key: Option<String>,
    outcome: Option<JobOutcome>,
}

#[derive(Debug)]
enum JobOutcome {
    Media(MediaRef),
    ProviderError(String),
    Malformed,
}

#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    /// Consecutive transient poll failures tolerated before giving up
    pub poll_retry_limit: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_retry_limit: DEFAULT_POLL_RETRIES,
        }
    }
}

/// Drives generation requests against a [`MediaProvider`]. [`run`](Self::run)
/// is the entry point for video; [`submit`](Self::submit) and
/// [`poll`](Self::poll) are its individual steps, exposed so the state
/// machine can be exercised directly.
///
/// [`MediaProvider`]: crate::provider::MediaProvider
pub struct JobDriver {
    provider: ProviderBox,
    config: DriverConfig,
}

impl JobDriver {
    pub fn new(provider: ProviderBox) -> Self {
        Self {
            provider,
            config: DriverConfig::default(),
        }
    }

    pub fn with_config(provider: ProviderBox, config: DriverConfig) -> Self {
        Self { provider, config }
    }

    /// Single round-trip image generation. An empty list means the provider
    /// had nothing to return, not that the request failed.
    pub async fn generate_images(
        &self,
        req: &GenerationRequest,
    ) -> Result<Vec<MediaResult>, GenerationError> {
        self.provider.generate_images(req).await
    }

    pub async fn submit(&self, req: &GenerationRequest) -> Result<Job, GenerationError> {
        let id = self.provider.submit_video(req).await?;
        debug!("video job submitted: {id}");
        Ok(Job {
            id,
            state: JobState::Submitted,
            attempts: 0,
            created_at: Instant::now(),
            api_key: req.api_key.clone(),
            outcome: None,
        })
    }

    /// One status check. Valid only while the job is non-terminal.
    pub async fn poll(&self, job: &mut Job) -> Result<(), GenerationError> {
        if job.state.is_terminal() {
            return Err(GenerationError::InvalidState(format!(
                "cannot poll job {} in state {:?}",
                job.id, job.state
            )));
        }

        let poll = self.provider.poll_video(&job.id, job.api_key.as_deref()).await?;

        if !poll.done {
            job.attempts += 1;
            job.state = JobState::Pending;
        } else if let Some(message) = poll.error {
            job.state = JobState::Failed;
            job.outcome = Some(JobOutcome::ProviderError(message));
        } else if let Some(media) = poll.media {
            job.state = JobState::Succeeded;
            job.outcome = Some(JobOutcome::Media(media));
        } else {
            job.state = JobState::Failed;
            job.outcome = Some(JobOutcome::Malformed);
        }
        Ok(())
    }

    /// Submits `req` and polls at a fixed interval until the job finishes,
    /// the attempt budget runs out, or `cancel` fires. The cadence is
    /// constant; one user action drives at most one job, so backoff buys
    /// nothing here. Transient transport failures while polling are retried
    /// up to `poll_retry_limit` consecutive times and still consume
    /// attempts.
    pub async fn run(
        &self,
        req: &GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<MediaResult, GenerationError> {
        cancel.check()?;
        let mut job = self.submit(req).await?;
        let mut consecutive_failures = 0u32;

        loop {
            if job.attempts >= self.config.max_attempts {
                job.state = JobState::TimedOut;
                warn!("video job {} timed out after {} attempts", job.id, job.attempts);
                return Err(GenerationError::Timeout {
                    attempts: job.attempts,
                });
            }

            self.wait(cancel).await?;
            cancel.check()?;

            match self.poll(&mut job).await {
                Ok(()) => consecutive_failures = 0,
                Err(err @ GenerationError::Submission { .. }) => {
                    consecutive_failures += 1;
                    job.attempts += 1;
                    if consecutive_failures > self.config.poll_retry_limit {
                        return Err(err);
                    }
                    warn!("poll for job {} failed ({err}), retrying", job.id);
                    continue;
                }
                Err(err) => return Err(err),
            }

            match job.state {
                JobState::Succeeded => return self.resolve(job, cancel).await,
                JobState::Failed => {
                    return Err(match job.outcome.take() {
                        Some(JobOutcome::ProviderError(message)) => {
                            GenerationError::Failed(message)
                        }
                        _ => GenerationError::Protocol(format!(
                            "job {} completed without an error or a result",
                            job.id
                        )),
                    });
                }
                JobState::Submitted | JobState::Pending | JobState::TimedOut => {}
            }
        }
    }

    async fn wait(&self, cancel: &CancelToken) -> Result<(), GenerationError> {
        tokio::select! {
            _ = sleep(self.config.poll_interval) => Ok(()),
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        }
    }

    async fn resolve(
        &self,
        mut job: Job,
        cancel: &CancelToken,
    ) -> Result<MediaResult, GenerationError> {
        let Some(JobOutcome::Media(media)) = job.outcome.take() else {
            return Err(GenerationError::Protocol(format!(
                "job {} succeeded without a stashed result",
                job.id
            )));
        };

        match media {
            MediaRef::Inline { mime_type, data } => Ok(MediaResult {
                mime_type,
                bytes: data,
            }),
            MediaRef::Uri(uri) => {
                cancel.check()?;
                debug!("fetching result of job {} from {uri}", job.id);
                let bytes = match self.provider.fetch_media(&uri, job.api_key.as_deref()).await {
                    Ok(bytes) => bytes,
                    // one retry on a transient download failure
                    Err(GenerationError::Submission { .. }) => {
                        cancel.check()?;
                        self.provider.fetch_media(&uri, job.api_key.as_deref()).await?
                    }
                    Err(err) => return Err(err),
                };
                Ok(MediaResult {
                    mime_type: VIDEO_MIME.to_string(),
                    bytes,
                })
            }
        }
    }
}
