//! Error taxonomy for the execution engine.
//!
//! [`RuntimeError`] is the Rust-side error type returned by fallible
//! operations that are allowed to propagate (infrastructure faults). User-code
//! faults (a skill that throws, a syntax error in submitted source) are never
//! turned into a `RuntimeError` — they are captured into `ExecutionResult.error`
//! instead, carrying the same [`ErrorKind`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire- and log-stable error kind names.
///
/// These strings appear verbatim in `ExecutionResult.error.kind`, in HTTP
/// error bodies, and in audit log entries, so renaming a variant is a
/// breaking change to the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    DuplicateSkill,
    DuplicateTool,
    SchemaError,
    ArgumentTypeError,
    MissingArgument,
    UnknownArgument,
    ToolExecutionError,
    ToolTimeout,
    SkillError,
    SyntaxError,
    RuntimeError,
    Timeout,
    InvalidDepSpec,
    RuntimeDepsDisabled,
    InstallFailed,
    AuthRequired,
    AuthInvalid,
    StorageUnavailable,
    Corrupt,
    ExecutorUnavailable,
    ExecutorClosed,
    TransportError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self).unwrap_or_default();
        write!(f, "{}", s.as_str().unwrap_or("Unknown"))
    }
}

/// Engine-side error type. Represents infrastructure faults that are raised
/// to the caller of `execute`/facade methods rather than contained inside an
/// `ExecutionResult`.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate skill: {0}")]
    DuplicateSkill(String),

    #[error("duplicate tool: {0}")]
    DuplicateTool(String),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("argument type error: {0}")]
    ArgumentTypeError(String),

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),

    #[error("tool execution failed (exit {exit_code:?}): {stderr_tail}")]
    ToolExecutionError {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("tool timed out after {0:?}")]
    ToolTimeout(std::time::Duration),

    #[error("skill error: {0}")]
    SkillError(String),

    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("runtime error: {0}")]
    UserRuntimeError(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid dependency spec: {0}")]
    InvalidDepSpec(String),

    #[error("runtime dependency mutation is disabled by policy")]
    RuntimeDepsDisabled,

    #[error("dependency install failed: {0}")]
    InstallFailed(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("invalid authentication token")]
    AuthInvalid,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("corrupt entry {name}: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("executor unavailable: {0}")]
    ExecutorUnavailable(String),

    #[error("executor is closed")]
    ExecutorClosed,

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] skill_context::ContextError),
}

impl RuntimeError {
    /// The wire-stable [`ErrorKind`] for this error.
    pub fn kind(&self) -> ErrorKind {
        use RuntimeError::*;
        match self {
            InvalidRequest(_) => ErrorKind::InvalidRequest,
            NotFound(_) => ErrorKind::NotFound,
            DuplicateSkill(_) => ErrorKind::DuplicateSkill,
            DuplicateTool(_) => ErrorKind::DuplicateTool,
            SchemaError(_) => ErrorKind::SchemaError,
            ArgumentTypeError(_) => ErrorKind::ArgumentTypeError,
            MissingArgument(_) => ErrorKind::MissingArgument,
            UnknownArgument(_) => ErrorKind::UnknownArgument,
            ToolExecutionError { .. } => ErrorKind::ToolExecutionError,
            ToolTimeout(_) => ErrorKind::ToolTimeout,
            SkillError(_) => ErrorKind::SkillError,
            SyntaxError(_) => ErrorKind::SyntaxError,
            UserRuntimeError(_) => ErrorKind::RuntimeError,
            Timeout(_) => ErrorKind::Timeout,
            InvalidDepSpec(_) => ErrorKind::InvalidDepSpec,
            RuntimeDepsDisabled => ErrorKind::RuntimeDepsDisabled,
            InstallFailed(_) => ErrorKind::InstallFailed,
            AuthRequired => ErrorKind::AuthRequired,
            AuthInvalid => ErrorKind::AuthInvalid,
            StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Corrupt { .. } => ErrorKind::Corrupt,
            ExecutorUnavailable(_) => ErrorKind::ExecutorUnavailable,
            ExecutorClosed => ErrorKind::ExecutorClosed,
            TransportError(_) => ErrorKind::TransportError,
            Lua(_) => ErrorKind::RuntimeError,
            Io(_) => ErrorKind::StorageUnavailable,
            TomlDe(_) => ErrorKind::SchemaError,
            Json(_) => ErrorKind::InvalidRequest,
            Storage(e) => match e {
                skill_context::ContextError::NotFound(_) => ErrorKind::NotFound,
                skill_context::ContextError::Conflict(_) => ErrorKind::InvalidRequest,
                skill_context::ContextError::Corrupt { .. } => ErrorKind::Corrupt,
                skill_context::ContextError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
                _ => ErrorKind::StorageUnavailable,
            },
        }
    }

    /// True if this error represents an infrastructure fault that must be
    /// raised to the caller rather than contained in an `ExecutionResult`.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            RuntimeError::ExecutorUnavailable(_)
                | RuntimeError::ExecutorClosed
                | RuntimeError::TransportError(_)
                | RuntimeError::StorageUnavailable(_)
                | RuntimeError::Io(_)
                | RuntimeError::Storage(skill_context::ContextError::StorageUnavailable(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
