//! Lightning AI job platform.
//!
//! Implements the [`JobPlatform`](crate::providers::traits::JobPlatform) trait
//! for Lightning AI jobs.
//!
//! Jobs run in a PyTorch CUDA image on an A100 with 4 CPUs and 16GB of memory.
//! The generated script is shipped as `train.py` in the job's `files` map and
//! launched with `python train.py`.
//!
//! ## Status values
//!
//! The job's `status` field is terminal on `completed` (success) and on
//! `failed` or `cancelled` (failure). Anything else keeps the job running.
//!
//! ## Example
//!
//! ```ignore
//! use gpu_jobs::providers::lightning::Lightning;
//! use gpu_jobs::providers::traits::JobPlatform;
//!
//! let platform = Lightning::new(api_key)?;
//! let handle = platform.create_job(&request).await?;
//! let report = platform.job_status(&handle.job_id).await?;
//! ```

mod client;
mod models;

pub use client::{Lightning, API_BASE_URL};
pub use models::*;
