//! Job platform implementations.
//!
//! This module contains the [`JobPlatform`] trait and one client per
//! supported GPU cloud.

mod http;
pub mod lightning;
pub mod paperspace;
pub mod traits;

pub use traits::{
    CreditsError, JobError, JobHandle, JobPlatform, JobRequest, JobResult, JobStatus, Platform,
    StatusReport, Task,
};
