//! `AppState`, `HttpServerConfig`, and `HttpServer` — the container session
//! server's construction and run loop (spec §4.I).
//!
//! Grounded in `skill-http::server::AppState::new`'s "construct engine, then
//! optionally sync deps" sequencing, generalized to wrap a `skill_runtime::Session`
//! directly rather than a bespoke instance manager. Fail-closed auth startup
//! (spec I7, scenario S6) is enforced in `HttpServer::with_config`, before any
//! listener is bound, exactly as spec §7 requires ("the server refuses to
//! start rather than defaulting to open").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use skill_runtime::{Session, SessionConfig};

use crate::routes::build_router;

/// Construction inputs for [`HttpServer`]. `token`/`auth_disabled` drive the
/// fail-closed startup check; exactly one must hold for the server to start.
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub token: Option<String>,
    pub auth_disabled: bool,
    pub session: SessionConfig,
}

/// Shared state behind every handler. `op_lock` enforces "at most one
/// executor operation (`execute`/`reset`) in flight at a time" (spec §5) at
/// the HTTP layer: a request that finds it already held returns `409
/// Conflict` immediately rather than queuing, which is how `execute during
/// reset` (spec §4.I's example of invalid state) becomes observable over the
/// wire instead of merely serialized away. Health and list endpoints never
/// take this lock, so they can run concurrently with an in-flight execution
/// (spec §5).
pub struct AppState {
    pub session: Session,
    pub token: Option<String>,
    pub auth_disabled: bool,
    pub op_lock: Mutex<()>,
    pub ready: AtomicBool,
}

impl AppState {
    pub async fn new(config: HttpServerConfig) -> Result<Arc<Self>> {
        if config.token.is_none() && !config.auth_disabled {
            bail!("Fatal: auth not configured");
        }
        let session = Session::open(config.session).await?;
        let state = Arc::new(Self {
            session,
            token: config.token,
            auth_disabled: config.auth_disabled,
            op_lock: Mutex::new(()),
            ready: AtomicBool::new(true),
        });
        Ok(state)
    }
}

/// The running server: a bound router plus the config needed to serve it.
pub struct HttpServer {
    state: Arc<AppState>,
    host: String,
    port: u16,
}

impl HttpServer {
    pub async fn with_config(config: HttpServerConfig) -> Result<Self> {
        let host = config.host.clone();
        let port = config.port;
        let state = AppState::new(config).await.map_err(|e| {
            tracing::error!(error = %e, "session server failed to start");
            e
        })?;
        Ok(Self { state, host, port })
    }

    pub async fn run(self) -> Result<()> {
        let router = build_router(self.state.clone())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "session server listening");
        axum::serve(listener, router).await?;
        Ok(())
    }
}

/// Acquire the single-in-flight-operation lock, or signal "already busy"
/// (409) without waiting, per the concurrency contract this struct documents.
pub async fn try_acquire_op(state: &AppState) -> std::result::Result<tokio::sync::MutexGuard<'_, ()>, ()> {
    state.op_lock.try_lock().map_err(|_| ())
}

/// Convenience used by tests and the CLI's embedded-server mode to know
/// whether the server considers itself past startup.
pub fn is_ready(state: &AppState) -> bool {
    state.ready.load(Ordering::SeqCst)
}
