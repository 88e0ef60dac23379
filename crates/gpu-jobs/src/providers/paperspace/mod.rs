//! Paperspace Gradient job platform.
//!
//! Jobs run on an `A4000` machine in the Gradient PyTorch container. The
//! command installs the Hugging Face packages the task needs and then runs the
//! script carried in the `JOB_SCRIPT` environment variable.
//!
//! The job's `state` field is terminal on `stopped` (success) and `error`
//! (failure).

mod client;
mod models;

pub use client::{Paperspace, API_BASE_URL, SCRIPT_ENV_VAR};
pub use models::*;
