//! Runtime configuration.
//!
//! Credentials, endpoints and the poll policy are read once at startup and
//! handed to the [`JobRunner`](crate::runner::JobRunner).

use std::time::Duration;

use crate::providers::{lightning, paperspace, Platform};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default deadline for a job to reach a terminal state (12 hours).
pub const DEFAULT_TIMEOUT_SECS: u64 = 12 * 60 * 60;

/// Bearer credentials.
///
/// Empty or whitespace-only values count as missing.
#[derive(Clone, Default)]
pub struct Credentials {
    lightning_api_key: Option<String>,
    paperspace_api_key: Option<String>,
    hf_token: Option<String>,
}

impl Credentials {
    /// Build from explicit values.
    #[must_use]
    pub fn new(
        lightning_api_key: Option<String>,
        paperspace_api_key: Option<String>,
        hf_token: Option<String>,
    ) -> Self {
        Self {
            lightning_api_key: normalize(lightning_api_key),
            paperspace_api_key: normalize(paperspace_api_key),
            hf_token: normalize(hf_token),
        }
    }

    /// Read `LIGHTNING_API_KEY`, `PAPERSPACE_API_KEY` and `HF_TOKEN`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("LIGHTNING_API_KEY").ok(),
            std::env::var("PAPERSPACE_API_KEY").ok(),
            std::env::var("HF_TOKEN").ok(),
        )
    }

    /// API key for a platform, if configured.
    #[must_use]
    pub fn api_key(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Lightning => self.lightning_api_key.as_deref(),
            Platform::Paperspace => self.paperspace_api_key.as_deref(),
        }
    }

    /// Hugging Face token injected into job environments.
    #[must_use]
    pub fn hf_token(&self) -> Option<&str> {
        self.hf_token.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("lightning_api_key", &mask(&self.lightning_api_key))
            .field("paperspace_api_key", &mask(&self.paperspace_api_key))
            .field("hf_token", &mask(&self.hf_token))
            .finish()
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// How a job is waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status polls.
    pub interval: Duration,
    /// Give up after this long. `None` waits until a terminal state or cancellation.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

/// Full runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer credentials.
    pub credentials: Credentials,
    /// Lightning AI API base URL.
    pub lightning_url: String,
    /// Paperspace API base URL.
    pub paperspace_url: String,
    /// Poll policy for `monitor`.
    pub poll: PollPolicy,
}

impl Config {
    /// Configuration with public endpoints and the default poll policy.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            lightning_url: lightning::API_BASE_URL.to_string(),
            paperspace_url: paperspace::API_BASE_URL.to_string(),
            poll: PollPolicy::default(),
        }
    }

    /// Override a platform's API base URL.
    #[must_use]
    pub fn with_base_url(mut self, platform: Platform, url: impl Into<String>) -> Self {
        match platform {
            Platform::Lightning => self.lightning_url = url.into(),
            Platform::Paperspace => self.paperspace_url = url.into(),
        }
        self
    }

    /// Override the poll policy.
    #[must_use]
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// API base URL for a platform.
    #[must_use]
    pub fn base_url(&self, platform: Platform) -> &str {
        match platform {
            Platform::Lightning => &self.lightning_url,
            Platform::Paperspace => &self.paperspace_url,
        }
    }
}
