//! GPU training and inference jobs on hosted GPU clouds.
//!
//! This crate submits a single training or inference job to a GPU cloud
//! platform, then polls it until it finishes.
//!
//! ## Flow
//!
//! ```text
//!   ScriptTemplate ──► JobRequest ──► POST /jobs ──► JobHandle
//!                                                       │
//!                          ┌────────────────────────────┘
//!                          ▼
//!                    GET /jobs/{id}  ◄──── sleep(interval) ────┐
//!                          │                                   │
//!              ┌───────────┼───────────────┐                   │
//!              ▼           ▼               ▼                   │
//!          succeeded     failed         running ───────────────┘
//!              │           │
//!          JobResult   JobFailed
//! ```
//!
//! The wait is bounded by [`PollPolicy::timeout`] and can be interrupted
//! through [`JobRunner::cancellation_token`].
//!
//! ## Supported Platforms
//!
//! - **Lightning AI** - A100 jobs, status field `status`
//! - **Paperspace Gradient** - A4000 jobs, status field `state`
//!
//! ## Example
//!
//! ```ignore
//! use gpu_jobs::{Config, Credentials, JobOptions, JobRunner, Platform, Task};
//!
//! let runner = JobRunner::new(Config::new(Credentials::from_env()));
//!
//! let handle = runner
//!     .submit(Platform::Lightning, Task::Train, "microsoft/phi-2", &JobOptions::default())
//!     .await?;
//! let result = runner.monitor(&handle).await?;
//! ```

pub mod config;
pub mod providers;
pub mod runner;
pub mod script;

pub use config::{Config, Credentials, PollPolicy};
pub use providers::{
    CreditsError, JobError, JobHandle, JobPlatform, JobRequest, JobResult, JobStatus, Platform,
    StatusReport, Task,
};
pub use runner::{job_name, JobOptions, JobRunner};
pub use script::{ParamOverrides, ScriptTemplate};
