//! Paperspace Gradient jobs API models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request body for creating a job.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobBody {
    /// Job name.
    pub name: String,
    /// Machine type (e.g., "A4000").
    pub machine_type: String,
    /// Container image.
    pub container: String,
    /// Shell command run in the container.
    pub command: String,
    /// Environment variables.
    pub env: BTreeMap<String, String>,
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
    /// Job state (`pending`, `running`, `stopped`, `error`, ...).
    #[serde(default)]
    pub state: Option<String>,
}
