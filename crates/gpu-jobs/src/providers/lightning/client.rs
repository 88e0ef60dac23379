//! Lightning AI jobs API client implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{info, warn};

use super::models::{CreateJobBody, CreatedJob, JobResources, JobResource};
use crate::providers::http::BearerClient;
use crate::providers::traits::{
    JobError, JobHandle, JobPlatform, JobRequest, JobResult, JobStatus, Platform, StatusReport,
};

/// Base URL for the Lightning AI API.
pub const API_BASE_URL: &str = "https://api.lightning.ai/v1";

/// Container image jobs run in.
const IMAGE: &str = "pytorch/pytorch:2.1.0-cuda12.1-cudnn8-runtime";

/// File name the generated script is written to.
const SCRIPT_FILE: &str = "train.py";

/// Lightning AI job platform.
#[derive(Debug, Clone)]
pub struct Lightning {
    http: BearerClient,
}

impl Lightning {
    /// Create a new Lightning AI client against the public API.
    ///
    /// # Errors
    /// Returns [`JobError::MissingCredential`] if the API key is empty, or an
    /// HTTP error if the client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self, JobError> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    /// Create a new Lightning AI client against a custom base URL.
    ///
    /// # Errors
    /// Same as [`Lightning::new`].
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, JobError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(JobError::MissingCredential(Platform::Lightning));
        }

        Ok(Self {
            http: BearerClient::new(base_url, api_key)?,
        })
    }

    /// Default hardware for jobs.
    #[must_use]
    pub fn default_resources() -> JobResources {
        JobResources {
            gpu: "A100".to_string(),
            cpu: 4,
            memory: "16GB".to_string(),
        }
    }

    /// Build the create-job body for a request.
    #[must_use]
    pub fn build_body(request: &JobRequest) -> CreateJobBody {
        let mut files = BTreeMap::new();
        files.insert(SCRIPT_FILE.to_string(), request.script.clone());

        CreateJobBody {
            name: request.name.clone(),
            image: IMAGE.to_string(),
            command: vec!["python".to_string(), SCRIPT_FILE.to_string()],
            files,
            resources: Self::default_resources(),
            env: request.env.clone(),
        }
    }

    /// Map the `status` field to a local status.
    #[must_use]
    pub fn map_status(raw: Option<&str>) -> JobStatus {
        match raw {
            Some("completed") => JobStatus::Succeeded,
            Some("failed") => JobStatus::Failed,
            Some("cancelled") => JobStatus::Cancelled,
            _ => JobStatus::Running,
        }
    }
}

#[async_trait]
impl JobPlatform for Lightning {
    fn platform(&self) -> Platform {
        Platform::Lightning
    }

    async fn create_job(&self, request: &JobRequest) -> Result<JobHandle, JobError> {
        info!(name = %request.name, task = %request.task, model = %request.model, "Submitting Lightning AI job");

        let body = Self::build_body(request);
        let response = self.http.post("/jobs", &body).await?;

        if !response.status.is_success() {
            return Err(JobError::Submission {
                platform: Platform::Lightning,
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let created: CreatedJob = response.json()?;
        info!(job_id = %created.id, "Lightning AI job submitted");

        Ok(JobHandle {
            job_id: created.id,
            platform: Platform::Lightning,
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusReport, JobError> {
        let response = self.http.get(&format!("/jobs/{job_id}")).await?;

        if !response.status.is_success() {
            return Err(JobError::StatusCheck {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let job: JobResource = response.json()?;
        Ok(StatusReport {
            status: Self::map_status(job.status.as_deref()),
            raw: job.status,
        })
    }

    async fn fetch_results(&self, job_id: &str) -> Result<JobResult, JobError> {
        // Artifact download is not implemented by the API client yet.
        info!(job_id = %job_id, "Downloading results");
        Ok(JobResult {
            job_id: job_id.to_string(),
            platform: Platform::Lightning,
            status: "completed".to_string(),
        })
    }

    async fn account(&self) -> Result<serde_json::Value, JobError> {
        let response = self.http.get("/account").await?;

        if !response.status.is_success() {
            warn!(status = response.status.as_u16(), "Lightning AI account request failed");
            return Err(JobError::StatusCheck {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        response.json()
    }
}
