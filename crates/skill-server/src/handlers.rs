//! Handlers for the container session server's HTTP surface (spec §4.I).
//! Each handler is a thin translation layer: decode the request, call the
//! matching `skill_runtime::Session` facade method, translate the result
//! (or error) to the HTTP status/body spec §7 and §4.I require.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use skill_runtime::{ErrorKind, RuntimeError};

use crate::server::{try_acquire_op, AppState};
use crate::types::{
    AddDepRequest, CreateArtifactRequest, CreateSkillRequest, ErrorBody, ExecuteRequest, HealthResponse,
    HealthStatus, OkResponse, SearchQuery,
};

/// Translates a raised [`RuntimeError`] (an infrastructure fault — user-code
/// faults never reach here, they're contained in `ExecutionResult.error`)
/// into the wire status codes spec §4.I/§7 name: `401`/`408`/`409`/`422`/`500`.
fn map_err(err: RuntimeError) -> Response {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::AuthRequired | ErrorKind::AuthInvalid => StatusCode::UNAUTHORIZED,
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::DuplicateSkill
        | ErrorKind::DuplicateTool
        | ErrorKind::ExecutorClosed
        | ErrorKind::RuntimeDepsDisabled => StatusCode::CONFLICT,
        ErrorKind::InvalidRequest
        | ErrorKind::SchemaError
        | ErrorKind::ArgumentTypeError
        | ErrorKind::MissingArgument
        | ErrorKind::UnknownArgument
        | ErrorKind::InvalidDepSpec => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            kind: kind.to_string(),
            message: err.to_string(),
        }),
    )
        .into_response()
}

// -- execution ------------------------------------------------------------

pub async fn execute(State(state): State<Arc<AppState>>, Json(req): Json<ExecuteRequest>) -> Response {
    let Ok(_guard) = try_acquire_op(&state).await else {
        return (
            StatusCode::CONFLICT,
            Json(ErrorBody {
                kind: "ExecutorClosed".to_string(),
                message: "another execute/reset is already in flight".to_string(),
            }),
        )
            .into_response();
    };

    let timeout = req.timeout.map(Duration::from_secs_f64);
    match state.session.run(&req.code, timeout).await {
        Ok(result) => {
            let status = if matches!(&result.error, Some(e) if e.kind == ErrorKind::Timeout) {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::OK
            };
            (status, Json(result)).into_response()
        }
        Err(e) => map_err(e),
    }
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Response {
    let Ok(_guard) = try_acquire_op(&state).await else {
        return (
            StatusCode::CONFLICT,
            Json(ErrorBody {
                kind: "ExecutorClosed".to_string(),
                message: "another execute/reset is already in flight".to_string(),
            }),
        )
            .into_response();
    };
    match state.session.reset().await {
        Ok(()) => Json(OkResponse::default()).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let status = if crate::server::is_ready(&state) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Starting
    };
    Json(HealthResponse { status }).into_response()
}

// -- tools ------------------------------------------------------------

pub async fn list_tools(State(state): State<Arc<AppState>>) -> Response {
    match state.session.list_tools() {
        Ok(tools) => Json(tools).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn search_tools(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Response {
    match state.session.search_tools(&q.q, q.limit.unwrap_or(5)) {
        Ok(tools) => Json(tools).into_response(),
        Err(e) => map_err(e),
    }
}

// -- skills ------------------------------------------------------------

pub async fn list_skills(State(state): State<Arc<AppState>>) -> Response {
    match state.session.list_skills().await {
        Ok(skills) => Json(skills).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn search_skills(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Response {
    match state.session.search_skills(&q.q, q.limit.unwrap_or(5)).await {
        Ok(skills) => Json(skills).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn get_skill(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.session.get_skill(&name).await {
        Ok(skill) => Json(skill).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn create_skill(State(state): State<Arc<AppState>>, Json(req): Json<CreateSkillRequest>) -> Response {
    match state
        .session
        .add_skill(&req.name, req.source, req.description, req.overwrite)
        .await
    {
        Ok(summary) => (StatusCode::CREATED, Json(summary)).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn delete_skill(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.session.remove_skill(&name).await {
        Ok(existed) => Json(OkResponse { ok: existed }).into_response(),
        Err(e) => map_err(e),
    }
}

// -- artifacts ------------------------------------------------------------

pub async fn list_artifacts(State(state): State<Arc<AppState>>) -> Response {
    match state.session.list_artifacts().await {
        Ok(artifacts) => Json(artifacts).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn create_artifact(State(state): State<Arc<AppState>>, Json(req): Json<CreateArtifactRequest>) -> Response {
    use base64::Engine;
    let data = match base64::engine::general_purpose::STANDARD.decode(req.data.as_bytes()) {
        Ok(d) => d,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    kind: ErrorKind::InvalidRequest.to_string(),
                    message: format!("invalid base64 payload: {e}"),
                }),
            )
                .into_response()
        }
    };
    let artifact = skill_context::Artifact {
        name: req.name,
        data,
        description: req.description.unwrap_or_default(),
        metadata: req.metadata,
        created_at: chrono::Utc::now(),
    };
    match state.session.save_artifact(&artifact).await {
        Ok(()) => (StatusCode::CREATED, Json(OkResponse::default())).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn get_artifact(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.session.load_artifact(&name).await {
        Ok(artifact) => Json(artifact).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn delete_artifact(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.session.delete_artifact(&name).await {
        Ok(existed) => Json(OkResponse { ok: existed }).into_response(),
        Err(e) => map_err(e),
    }
}

// -- deps ------------------------------------------------------------

pub async fn list_deps(State(state): State<Arc<AppState>>) -> Response {
    match state.session.list_deps().await {
        Ok(deps) => Json(deps).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn add_dep(State(state): State<Arc<AppState>>, Json(req): Json<AddDepRequest>) -> Response {
    match state.session.add_dep(&req.spec).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn remove_dep(State(state): State<Arc<AppState>>, Path(spec): Path<String>) -> Response {
    match state.session.remove_dep(&spec).await {
        Ok(existed) => Json(OkResponse { ok: existed }).into_response(),
        Err(e) => map_err(e),
    }
}

pub async fn sync_deps(State(state): State<Arc<AppState>>) -> Response {
    match state.session.sync_deps().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => map_err(e),
    }
}
