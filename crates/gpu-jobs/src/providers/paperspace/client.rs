//! Paperspace Gradient jobs API client implementation.

use async_trait::async_trait;
use tracing::{info, warn};

use super::models::{CreateJobBody, CreatedJob, JobResource};
use crate::providers::http::BearerClient;
use crate::providers::traits::{
    JobError, JobHandle, JobPlatform, JobRequest, JobResult, JobStatus, Platform, StatusReport,
};
use crate::script;

/// Base URL for the Paperspace API.
pub const API_BASE_URL: &str = "https://api.paperspace.com/v1";

/// Machine type jobs run on.
const MACHINE_TYPE: &str = "A4000";

/// Container image jobs run in.
const CONTAINER: &str = "paperspace/gradient-base:pytorch";

/// Environment variable carrying the script source into the container.
pub const SCRIPT_ENV_VAR: &str = "JOB_SCRIPT";

/// Paperspace Gradient job platform.
#[derive(Debug, Clone)]
pub struct Paperspace {
    http: BearerClient,
}

impl Paperspace {
    /// Create a new Paperspace client against the public API.
    ///
    /// # Errors
    /// Returns [`JobError::MissingCredential`] if the API key is empty, or an
    /// HTTP error if the client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self, JobError> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    /// Create a new Paperspace client against a custom base URL.
    ///
    /// # Errors
    /// Same as [`Paperspace::new`].
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, JobError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(JobError::MissingCredential(Platform::Paperspace));
        }

        Ok(Self {
            http: BearerClient::new(base_url, api_key)?,
        })
    }

    /// Shell command that installs dependencies and runs the script.
    ///
    /// The script itself is read from [`SCRIPT_ENV_VAR`], so nothing from the
    /// request is spliced into the command line.
    #[must_use]
    pub fn launch_command(task: crate::Task) -> String {
        format!(
            "cd /app && pip install {} && python -c \"${SCRIPT_ENV_VAR}\"",
            script::pip_packages(task).join(" ")
        )
    }

    /// Build the create-job body for a request.
    #[must_use]
    pub fn build_body(request: &JobRequest) -> CreateJobBody {
        let mut env = request.env.clone();
        env.insert(SCRIPT_ENV_VAR.to_string(), request.script.clone());

        CreateJobBody {
            name: request.name.clone(),
            machine_type: MACHINE_TYPE.to_string(),
            container: CONTAINER.to_string(),
            command: Self::launch_command(request.task),
            env,
        }
    }

    /// Map the `state` field to a local status.
    #[must_use]
    pub fn map_status(raw: Option<&str>) -> JobStatus {
        match raw {
            Some("stopped") => JobStatus::Succeeded,
            Some("error") => JobStatus::Failed,
            _ => JobStatus::Running,
        }
    }
}

#[async_trait]
impl JobPlatform for Paperspace {
    fn platform(&self) -> Platform {
        Platform::Paperspace
    }

    async fn create_job(&self, request: &JobRequest) -> Result<JobHandle, JobError> {
        info!(name = %request.name, task = %request.task, model = %request.model, "Submitting Paperspace job");

        let body = Self::build_body(request);
        let response = self.http.post("/jobs", &body).await?;

        if !response.status.is_success() {
            return Err(JobError::Submission {
                platform: Platform::Paperspace,
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let created: CreatedJob = response.json()?;
        info!(job_id = %created.id, "Paperspace job submitted");

        Ok(JobHandle {
            job_id: created.id,
            platform: Platform::Paperspace,
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
            status: Self::map_status(job.state.as_deref()),
            raw: job.state,
        })
    }

    async fn fetch_results(&self, job_id: &str) -> Result<JobResult, JobError> {
        // Artifact download is not implemented by the API client yet.
        info!(job_id = %job_id, "Downloading results");
        Ok(JobResult {
            job_id: job_id.to_string(),
            platform: Platform::Paperspace,
            status: "completed".to_string(),
        })
    }

    async fn account(&self) -> Result<serde_json::Value, JobError> {
        let response = self.http.get("/account").await?;

        if !response.status.is_success() {
            warn!(status = response.status.as_u16(), "Paperspace account request failed");
            return Err(JobError::StatusCheck {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        response.json()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::providers::traits::Task;

    #[test]
    fn test_new_requires_api_key() {
        assert!(matches!(
            Paperspace::new(""),
            Err(JobError::MissingCredential(Platform::Paperspace))
        ));
        assert!(Paperspace::new("key").is_ok());
    }

    #[test]
    fn test_map_status() {
        assert_eq!(Paperspace::map_status(Some("stopped")), JobStatus::Succeeded);
        assert_eq!(Paperspace::map_status(Some("error")), JobStatus::Failed);
        assert_eq!(Paperspace::map_status(Some("running")), JobStatus::Running);
        // Lightning terminal values mean nothing here.
        assert_eq!(Paperspace::map_status(Some("completed")), JobStatus::Running);
        assert_eq!(Paperspace::map_status(Some("failed")), JobStatus::Running);
        assert_eq!(Paperspace::map_status(Some("cancelled")), JobStatus::Running);
        assert_eq!(Paperspace::map_status(None), JobStatus::Running);
    }

    #[test]
    fn test_launch_command_per_task() {
        assert_eq!(
            Paperspace::launch_command(Task::Train),
            "cd /app && pip install transformers accelerate datasets && python -c \"$JOB_SCRIPT\""
        );
        assert_eq!(
            Paperspace::launch_command(Task::Inference),
            "cd /app && pip install transformers accelerate && python -c \"$JOB_SCRIPT\""
        );
    }

    #[test]
    fn test_build_body_carries_script_in_env() {
        let mut env = BTreeMap::new();
        env.insert("TASK".to_string(), "inference".to_string());
        let request = JobRequest {
            name: "paperspace-inference-llama-1700000000".to_string(),
            task: Task::Inference,
            model: "llama".to_string(),
            script: "print(\"$HOME\")".to_string(),
            env,
        };

        let body = serde_json::to_value(Paperspace::build_body(&request)).unwrap();
        assert_eq!(body["machineType"], "A4000");
        assert_eq!(body["container"], "paperspace/gradient-base:pytorch");
        assert_eq!(body["env"]["TASK"], "inference");
        assert_eq!(body["env"]["JOB_SCRIPT"], "print(\"$HOME\")");
        assert!(!body["command"].as_str().unwrap().contains("HOME"));
    }
}
