//! Job submission and monitoring.
//!
//! [`JobRunner`] submits a single job to the selected platform and then waits
//! for it, polling the platform's status field on a fixed interval. The wait
//! is bounded by the configured deadline and can be interrupted through a
//! [`CancellationToken`].

use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::providers::lightning::Lightning;
use crate::providers::paperspace::Paperspace;
use crate::providers::{
    CreditsError, JobError, JobHandle, JobPlatform, JobRequest, JobResult, JobStatus, Platform,
    Task,
};
use crate::script::{ParamOverrides, ScriptTemplate};

/// Optional extras for a submission.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Script source replacing the built-in template.
    pub script: Option<String>,
    /// Hyperparameter overrides.
    pub overrides: ParamOverrides,
}

/// Job name: `{platform}-{task}-{model}-{unix_seconds}`.
///
/// Characters in the model id outside `[A-Za-z0-9._-]` become `-`.
#[must_use]
pub fn job_name(platform: Platform, task: Task, model: &str, at: DateTime<Utc>) -> String {
    let model: String = model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{platform}-{task}-{model}-{}", at.timestamp())
}

/// Submits jobs and waits for them to finish.
pub struct JobRunner {
    config: Config,
    cancel: CancellationToken,
}

impl JobRunner {
    /// Create a runner with a fresh cancellation token.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that interrupts [`JobRunner::monitor`] when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runtime configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Client for a platform. Fails without touching the network when the
    /// credential is missing.
    fn platform_client(&self, platform: Platform) -> Result<Box<dyn JobPlatform>, JobError> {
        let api_key = self
            .config
            .credentials
            .api_key(platform)
            .ok_or(JobError::MissingCredential(platform))?;
        let base_url = self.config.base_url(platform);

        let client: Box<dyn JobPlatform> = match platform {
            Platform::Lightning => Box::new(Lightning::with_base_url(api_key, base_url)?),
            Platform::Paperspace => Box::new(Paperspace::with_base_url(api_key, base_url)?),
        };
        Ok(client)
    }

    /// Build the request for a submission at time `at`.
    ///
    /// # Errors
    /// Returns a serialization error if the script parameters cannot be encoded.
    pub fn build_request(
        &self,
        platform: Platform,
        task: Task,
        model: &str,
        options: &JobOptions,
        at: DateTime<Utc>,
    ) -> Result<JobRequest, JobError> {
        let template = ScriptTemplate::for_task(task).with_overrides(&options.overrides);
        let hf_token = self.config.credentials.hf_token();
        if hf_token.is_none() {
            warn!("HF_TOKEN not set, gated models will fail to download");
        }

        let env = template.env(model, hf_token)?;
        let script = options
            .script
            .clone()
            .unwrap_or_else(|| template.source().to_string());

        Ok(JobRequest {
            name: job_name(platform, task, model, at),
            task,
            model: model.to_string(),
            script,
            env,
        })
    }

    /// Submit a job. One POST, no retry.
    ///
    /// # Errors
    /// - [`JobError::MissingCredential`] if the platform has no API key (no request is made)
    /// - [`JobError::Submission`] on a non-success response
    pub async fn submit(
        &self,
        platform: Platform,
        task: Task,
        model: &str,
        options: &JobOptions,
    ) -> Result<JobHandle, JobError> {
        let client = self.platform_client(platform)?;
        let request = self.build_request(platform, task, model, options, Utc::now())?;
        client.create_job(&request).await
    }

    /// Poll a job until it reaches a terminal state.
    ///
    /// # Errors
    /// - [`JobError::JobFailed`] when the job ends in a failure state
    /// - [`JobError::StatusCheck`] on a non-success poll response
    /// - [`JobError::Timeout`] when the deadline passes first
    /// - [`JobError::Cancelled`] when the cancellation token fires
    pub async fn monitor(&self, handle: &JobHandle) -> Result<JobResult, JobError> {
        let client = self.platform_client(handle.platform)?;
        let policy = self.config.poll;
        let started = Instant::now();
        let job_id = handle.job_id.as_str();
        let cancelled = || JobError::Cancelled {
            job_id: job_id.to_string(),
        };

        info!(job_id, platform = %handle.platform, interval_secs = policy.interval.as_secs(), "Monitoring job");

        let mut polls: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(cancelled());
            }

            let report = tokio::select! {
                () = self.cancel.cancelled() => return Err(cancelled()),
                report = client.job_status(job_id) => report?,
            };
            polls += 1;

            info!(job_id, status = %report, poll = polls, "Job status");

            match report.status {
                JobStatus::Succeeded => {
                    info!(job_id, polls, elapsed_secs = started.elapsed().as_secs(), "Job completed");
                    return client.fetch_results(job_id).await;
                }
                JobStatus::Failed | JobStatus::Cancelled => {
                    return Err(JobError::JobFailed {
                        job_id: job_id.to_string(),
                        state: report.to_string(),
                    });
                }
                JobStatus::Running => {}
            }

            let wait = match policy.timeout {
                Some(timeout) => {
                    let elapsed = started.elapsed();
                    if elapsed >= timeout {
                        return Err(JobError::Timeout {
                            job_id: job_id.to_string(),
                            secs: timeout.as_secs(),
                        });
                    }
                    policy.interval.min(timeout - elapsed)
                }
                None => policy.interval,
            };

            debug!(job_id, wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX), "Waiting before next poll");

            tokio::select! {
                () = self.cancel.cancelled() => return Err(cancelled()),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Submit a job and wait for it.
    ///
    /// # Errors
    /// Any error from [`JobRunner::submit`] or [`JobRunner::monitor`].
    pub async fn run(
        &self,
        platform: Platform,
        task: Task,
        model: &str,
        options: &JobOptions,
    ) -> Result<JobResult, JobError> {
        let handle = self.submit(platform, task, model, options).await?;
        self.monitor(&handle).await
    }

    /// Query account credits for a platform given by name.
    ///
    /// # Errors
    /// A [`CreditsError`] whose [`to_record`](CreditsError::to_record) is the
    /// `{"error": ...}` record printed by the CLI. Unknown platforms and
    /// missing credentials are reported without a network call.
    pub async fn check_credits(&self, platform: &str) -> Result<serde_json::Value, CreditsError> {
        let platform: Platform = platform
            .parse()
            .map_err(|_| CreditsError::UnknownPlatform)?;

        let client = match self.platform_client(platform) {
            Ok(client) => client,
            Err(JobError::MissingCredential(_)) => {
                return Err(CreditsError::MissingCredential(platform))
            }
            Err(e) => {
                warn!(platform = %platform, error = %e, "Failed to create API client");
                return Err(CreditsError::RequestFailed(platform));
            }
        };

        client.account().await.map_err(|e| {
            warn!(platform = %platform, error = %e, "Credits request failed");
            CreditsError::RequestFailed(platform)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::config::Credentials;

    fn runner(credentials: Credentials) -> JobRunner {
        JobRunner::new(Config::new(credentials))
    }

    #[test]
    fn test_job_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            job_name(Platform::Lightning, Task::Train, "microsoft/phi-2", at),
            "lightning-train-microsoft-phi-2-1704067200"
        );
        assert_eq!(
            job_name(Platform::Paperspace, Task::Inference, "llama-2-7b", at),
            "paperspace-inference-llama-2-7b-1704067200"
        );
    }

    #[test]
    fn test_job_name_unique_across_timestamps() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        assert_ne!(
            job_name(Platform::Lightning, Task::Finetune, "phi-2", first),
            job_name(Platform::Lightning, Task::Finetune, "phi-2", second)
        );
    }

    #[test]
    fn test_build_request_uses_template() {
        let runner = runner(Credentials::new(
            Some("lk".to_string()),
            None,
            Some("hf".to_string()),
        ));
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let request = runner
            .build_request(Platform::Lightning, Task::Train, "phi-2", &JobOptions::default(), at)
            .unwrap();

        assert_eq!(request.name, "lightning-train-phi-2-1704067200");
        assert_eq!(request.script, ScriptTemplate::for_task(Task::Train).source());
        assert_eq!(request.env["MODEL_NAME"], "phi-2");
        assert_eq!(request.env["TASK"], "train");
        assert_eq!(request.env["HF_TOKEN"], "hf");
    }

    #[test]
    fn test_build_request_custom_script() {
        let runner = runner(Credentials::default());
        let options = JobOptions {
            script: Some("print('custom')".to_string()),
            ..Default::default()
        };

        let request = runner
            .build_request(Platform::Paperspace, Task::Inference, "gpt2", &options, Utc::now())
            .unwrap();

        assert_eq!(request.script, "print('custom')");
        assert!(request.env.contains_key("JOB_PARAMS"));
    }

    #[tokio::test]
    async fn test_submit_without_credential() {
        let runner = runner(Credentials::default());
        for platform in [Platform::Lightning, Platform::Paperspace] {
            let err = runner
                .submit(platform, Task::Train, "phi-2", &JobOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, JobError::MissingCredential(p) if p == platform));
        }
    }

    #[tokio::test]
    async fn test_check_credits_unknown_platform() {
        let runner = runner(Credentials::default());
        let err = runner.check_credits("unknown").await.unwrap_err();
        assert_eq!(err, CreditsError::UnknownPlatform);
        assert_eq!(err.to_record(), serde_json::json!({ "error": "Unknown platform" }));
    }

    #[tokio::test]
    async fn test_monitor_cancelled_before_first_poll() {
        let runner = runner(Credentials::new(Some("lk".to_string()), None, None));
        runner.cancellation_token().cancel();

        let handle = JobHandle {
            job_id: "abc".to_string(),
            platform: Platform::Lightning,
        };
        let err = runner.monitor(&handle).await.unwrap_err();
        assert!(matches!(err, JobError::Cancelled { job_id } if job_id == "abc"));
    }
}
