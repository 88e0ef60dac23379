//! Lightning AI jobs API models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request body for creating a job.
#[derive(Debug, Serialize)]
pub struct CreateJobBody {
    /// Job name.
    pub name: String,
    /// Container image.
    pub image: String,
    /// Command executed in the container.
    pub command: Vec<String>,
    /// Files written into the working directory before the command runs.
    pub files: BTreeMap<String, String>,
    /// Hardware requested for the job.
    pub resources: JobResources,
    /// Environment variables.
    pub env: BTreeMap<String, String>,
}

/// Hardware requested for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResources {
    /// GPU type (e.g., "A100").
    pub gpu: String,
    /// Number of CPUs.
    pub cpu: u32,
    /// Memory (e.g., "16GB").
    pub memory: String,
}

/// Response returned when a job is created.
#[derive(Debug, Deserialize)]
pub struct CreatedJob {
    /// Job ID.
    pub id: String,
}

/// Job resource returned by `GET /jobs/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct JobResource {
    /// Job ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Job status (`pending`, `running`, `completed`, `failed`, `cancelled`, ...).
    #[serde(default)]
    pub status: Option<String>,
}
