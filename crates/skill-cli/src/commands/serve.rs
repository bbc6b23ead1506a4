//! `skill serve` — run the container session server in-process, for local
//! development against the same `SessionConfig` the other subcommands use.

use anyhow::Result;
use skill_runtime::SessionConfig;
use skill_server::{HttpServer, HttpServerConfig};

pub async fn run(session: SessionConfig, host: String, port: u16, token: Option<String>, auth_disabled: bool) -> Result<()> {
    let config = HttpServerConfig {
        host,
        port,
        token,
        auth_disabled,
        session,
    };
    let server = HttpServer::with_config(config).await?;
    server.run().await
}
