//! Core data model shared across the execution engine: tools, parameters,
//! and the `ExecutionResult` wire shape.
//!
//! The persisted entities (`Skill`, `Artifact`, `Dep`, `StorageAccess`) are
//! owned by `skill-context` — the crate the storage backends live in — and
//! re-exported here unchanged so agent-facing code only ever imports from
//! `skill_runtime`.

use serde::{Deserialize, Serialize};

use crate::errors::ErrorKind;

pub use skill_context::{Artifact, ArtifactSummary, Dep, Skill, SkillParameter, SkillSummary, StorageAccess};

/// Semantic parameter type carried by a [`ToolCallable`] or skill signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Boolean,
    Integer,
    ArrayOfString,
}

/// A single named parameter on a tool callable or skill signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// An invocation binding: which adapter, which tool, which recipe (or the
/// escape-hatch "no recipe" form) a [`ToolCallable`] resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationBinding {
    pub adapter: String,
    pub tool: String,
    pub recipe: Option<String>,
}

/// A named, invocable operation exposed by a tool — either a declared recipe
/// or the tool's escape-hatch form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallable {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    pub binding: InvocationBinding,
}

/// Immutable descriptor of an external capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub callables: Vec<ToolCallable>,
}

impl Tool {
    /// Summary view used by `tools.list()`/`tools.search()` — no callable
    /// detail, just enough to decide whether to look closer.
    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            recipe_names: self.callables.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub recipe_names: Vec<String>,
}

/// Structured error attached to a failed [`ExecutionResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Outcome of a single `execute(code)` call.
///
/// Invariant: exactly one of `error.is_none()` (success) or
/// `error.is_some()` (failure) holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub value: serde_json::Value,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    pub fn ok(value: serde_json::Value, stdout: String, stderr: String, duration_ms: u64) -> Self {
        Self {
            value,
            stdout,
            stderr,
            duration_ms,
            error: None,
        }
    }

    pub fn failed(
        kind: ErrorKind,
        message: impl Into<String>,
        stdout: String,
        stderr: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            value: serde_json::Value::Null,
            stdout,
            stderr,
            duration_ms,
            error: Some(ExecutionError {
                kind,
                message: message.into(),
                trace: None,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Log level for host-side structured logging, mirrored onto `tracing::Level`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
