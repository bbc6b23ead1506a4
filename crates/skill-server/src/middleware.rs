//! Bearer-token authentication (spec §4.I). Added as an `axum::middleware`
//! layer the same way the teacher composes its CORS/trace layers — this is
//! new relative to the teacher (whose HTTP server had no auth layer at all),
//! following the idiomatic axum request-scoped-auth pattern rather than a
//! bespoke extractor.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::server::AppState;
use crate::types::ErrorBody;

/// Rejects any request without a valid `Authorization: Bearer <token>`
/// header, unless the server was started with auth explicitly disabled.
/// `AppState::new` already refuses to construct a server with auth neither
/// configured nor disabled (spec I7), so by the time this layer runs exactly
/// one of `state.token` or `state.auth_disabled` holds.
pub async fn require_bearer_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if state.auth_disabled {
        return next.run(req).await;
    }

    let Some(expected) = state.token.as_deref() else {
        return unauthorized("authentication not configured");
    };

    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if token == expected => next.run(req).await,
        Some(_) => unauthorized("invalid bearer token"),
        None => unauthorized("missing bearer token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            kind: "AuthInvalid".to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}
