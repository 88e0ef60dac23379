//! Job platform trait and common types.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while submitting or monitoring a job.
#[derive(Error, Debug)]
pub enum JobError {
    /// No bearer credential configured for the platform.
    #[error("{} not found in environment", .0.api_key_var())]
    MissingCredential(Platform),

    /// Job creation returned a non-success status.
    #[error("{} job submission failed ({status}): {body}", .platform.display_name())]
    Submission {
        platform: Platform,
        status: u16,
        body: String,
    },

    /// A status poll returned a non-success status.
    #[error("Failed to check job status ({status}): {body}")]
    StatusCheck { status: u16, body: String },

    /// The remote job reached a failure terminal state.
    #[error("Job {job_id} {state}")]
    JobFailed { job_id: String, state: String },

    /// Platform name not recognised.
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// Job did not reach a terminal state before the deadline.
    #[error("Job {job_id} still running after {secs} seconds")]
    Timeout { job_id: String, secs: u64 },

    /// Monitoring was cancelled before the job finished.
    #[error("Monitoring of job {job_id} was cancelled")]
    Cancelled { job_id: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Supported GPU cloud platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Lightning AI.
    Lightning,
    /// Paperspace Gradient.
    Paperspace,
}

impl Platform {
    /// Lowercase identifier used on the command line and in job names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lightning => "lightning",
            Self::Paperspace => "paperspace",
        }
    }

    /// Human-readable platform name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Lightning => "Lightning AI",
            Self::Paperspace => "Paperspace",
        }
    }

    /// Short vendor name.
    #[must_use]
    pub fn vendor(self) -> &'static str {
        match self {
            Self::Lightning => "Lightning",
            Self::Paperspace => "Paperspace",
        }
    }

    /// Environment variable holding the platform API key.
    #[must_use]
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Lightning => "LIGHTNING_API_KEY",
            Self::Paperspace => "PAPERSPACE_API_KEY",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lightning" => Ok(Self::Lightning),
            "paperspace" => Ok(Self::Paperspace),
            _ => Err(JobError::UnknownPlatform(s.to_string())),
        }
    }
}

/// Kind of work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Train a causal language model.
    Train,
    /// Run text generation against a model.
    Inference,
    /// Fine-tune an existing model.
    Finetune,
}

impl Task {
    /// Lowercase identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Inference => "inference",
            Self::Finetune => "finetune",
        }
    }

    /// Whether the task runs the training loop.
    #[must_use]
    pub fn is_training(self) -> bool {
        matches!(self, Self::Train | Self::Finetune)
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locally mapped job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Not terminal yet; keep polling.
    Running,
    /// Terminal success.
    Succeeded,
    /// Terminal failure.
    Failed,
    /// Terminal cancellation.
    Cancelled,
}

impl JobStatus {
    /// Whether polling should stop.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a single status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Raw value of the platform's status field, if present.
    pub raw: Option<String>,
    /// Mapped status.
    pub status: JobStatus,
}

impl std::fmt::Display for StatusReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.raw.as_deref().unwrap_or("unknown"))
    }
}

/// A submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Identifier assigned by the platform.
    pub job_id: String,
    /// Platform the job runs on.
    pub platform: Platform,
}

/// Record returned once a job completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Job identifier.
    pub job_id: String,
    /// Platform the job ran on.
    pub platform: Platform,
    /// Final status.
    pub status: String,
}

/// Platform-agnostic job submission.
///
/// Providers wrap this in their own body format, adding the container image,
/// resources and launch command.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Unique job name.
    pub name: String,
    /// Task being run.
    pub task: Task,
    /// Model identifier.
    pub model: String,
    /// Script source executed on the remote machine.
    pub script: String,
    /// Environment passed to the job.
    pub env: BTreeMap<String, String>,
}

/// Failure record for a credits query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreditsError {
    /// No API key configured.
    #[error("No {} API key", .0.vendor())]
    MissingCredential(Platform),

    /// The account request failed.
    #[error("Failed to get credits")]
    RequestFailed(Platform),

    /// Platform name not recognised.
    #[error("Unknown platform")]
    UnknownPlatform,
}

impl CreditsError {
    /// JSON error record, e.g. `{"error": "Unknown platform"}`.
    #[must_use]
    pub fn to_record(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

/// Trait for GPU job platforms.
#[async_trait]
pub trait JobPlatform: Send + Sync {
    /// Platform this client talks to.
    fn platform(&self) -> Platform;

    /// Submit a job.
    async fn create_job(&self, request: &JobRequest) -> Result<JobHandle, JobError>;

    /// Poll the job status once.
    async fn job_status(&self, job_id: &str) -> Result<StatusReport, JobError>;

    /// Collect the results of a completed job.
    ///
    /// Artifact download is not implemented; this returns a fixed record.
    async fn fetch_results(&self, job_id: &str) -> Result<JobResult, JobError>;

    /// Fetch account and credit information.
    async fn account(&self) -> Result<serde_json::Value, JobError>;
}
