//! Bearer-authenticated JSON HTTP plumbing shared by the platform clients.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::providers::traits::JobError;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("gpu-jobs/", env!("CARGO_PKG_VERSION"));

/// Raw response: status plus body text.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, JobError> {
        serde_json::from_str(&self.body).map_err(JobError::Serialization)
    }
}

/// HTTP client bound to one API base URL and bearer token.
#[derive(Clone)]
pub(crate) struct BearerClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BearerClient {
    /// Build a client for `base_url` authenticating with `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, JobError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Make an authenticated GET request.
    pub async fn get(&self, path: &str) -> Result<RawResponse, JobError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        Self::read(response).await
    }

    /// Make an authenticated POST request with a JSON body.
    pub async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, JobError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse, JobError> {
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "Response received");
        Ok(RawResponse { status, body })
    }
}

impl std::fmt::Debug for BearerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}
