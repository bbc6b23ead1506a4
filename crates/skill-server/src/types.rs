//! Wire types for the container session server's HTTP surface (spec §4.I,
//! §6 "Execution-result wire form"). `ExecutionResult` itself is defined in
//! `skill_runtime::types` and reused verbatim; everything here is request
//! bodies and the handful of response shapes that have no other home.

use serde::{Deserialize, Serialize};

/// Body of `POST /execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    /// Timeout in fractional seconds; absent means "no timeout".
    #[serde(default)]
    pub timeout: Option<f64>,
}

/// Body of `POST /reset` response and other bare acknowledgements.
#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl Default for OkResponse {
    fn default() -> Self {
        Self { ok: true }
    }
}

/// `GET /health` response (spec §4.I).
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Starting,
    Unhealthy,
}

/// Query string for `GET /tools/search` and `GET /skills/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Body of `POST /skills`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSkillRequest {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
}

/// Body of `POST /artifacts`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArtifactRequest {
    pub name: String,
    /// Base64-encoded payload (matches `skill_context::Artifact`'s wire form).
    pub data: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
}

/// Body of `POST /deps`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddDepRequest {
    pub spec: String,
}

/// The standard error body for every non-2xx response (spec §7).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}
