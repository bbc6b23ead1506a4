//! Entrypoint for the container image the `ContainerExecutor` (spec §4.G.3)
//! launches. Reads the bootstrap payload the executor passes through the
//! container's environment (`SKILL_AUTH_TOKEN`, `SKILL_STORAGE_ACCESS`,
//! `SKILL_DEPS_CONFIG`) plus the read-only tools mount at `/tools`, and
//! serves the HTTP surface on `0.0.0.0:8080` to match the port the executor
//! maps (`{host_port}:8080`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use skill_context::StorageAccess;
use skill_runtime::{DepsConfig, SessionConfig};
use skill_server::{HttpServer, HttpServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let token = std::env::var("SKILL_AUTH_TOKEN").ok();
    let auth_disabled = std::env::var("SKILL_AUTH_DISABLE").map(|v| v == "1" || v == "true").unwrap_or(false);

    let storage_access: StorageAccess = match std::env::var("SKILL_STORAGE_ACCESS") {
        Ok(json) => serde_json::from_str(&json).context("SKILL_STORAGE_ACCESS is not a valid StorageAccess descriptor")?,
        Err(_) => StorageAccess::File {
            base_path: PathBuf::from("/data"),
        },
    };

    let deps_config: DepsConfig = match std::env::var("SKILL_DEPS_CONFIG") {
        Ok(json) => serde_json::from_str(&json).context("SKILL_DEPS_CONFIG is not a valid DepsConfig")?,
        Err(_) => DepsConfig::default(),
    };

    let tools_path = std::env::var("SKILL_TOOLS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tools"));

    let host = std::env::var("SKILL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("SKILL_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);

    let config = HttpServerConfig {
        host,
        port,
        token,
        auth_disabled,
        session: SessionConfig {
            storage_access,
            tools_path,
            deps_config,
            embedder: None,
            sync_deps_on_start: true,
        },
    };

    let server = HttpServer::with_config(config).await?;
    server.run().await
}
