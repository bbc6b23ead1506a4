//! The subprocess-kernel binary (spec §4.G.2): a long-lived interpreter
//! child process speaking newline-delimited JSON-RPC over stdio with
//! `SubprocessExecutor`. Signals readiness, waits for a bootstrap message,
//! then serves `execute`/`reset` requests strictly in order.
//!
//! Delegates all execution semantics to [`skill_runtime::executor::InProcessExecutor`]
//! rather than reimplementing them — the kernel's job is only the process
//! boundary (stdio framing, readiness signal, bootstrap), not a second copy
//! of the Lua execution logic.

use std::time::Duration;

use skill_runtime::executor::{read_line, write_line, Executor, InProcessExecutor, KernelRequest, KernelResponse};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "skill-kernel exiting with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let stdin = tokio::io::stdin();
    let mut reader = tokio::io::BufReader::new(stdin);
    let mut stdout = tokio::io::stdout();

    write_line(&mut stdout, &KernelResponse::Ready).await?;

    let mut executor: Option<InProcessExecutor> = None;

    loop {
        let request: KernelRequest = match read_line(&mut reader).await {
            Ok(req) => req,
            Err(_) => {
                // stdin closed: the parent process is gone.
                break;
            }
        };

        let response = match request {
            KernelRequest::Bootstrap { config } => match InProcessExecutor::from_bootstrap_config(&config, None).await {
                Ok(exec) => {
                    executor = Some(exec);
                    KernelResponse::Ok
                }
                Err(e) => KernelResponse::Error { message: e.to_string() },
            },
            KernelRequest::Execute { code, timeout_ms } => match &executor {
                Some(exec) => {
                    let timeout = timeout_ms.map(Duration::from_millis);
                    match exec.execute(&code, timeout).await {
                        Ok(result) => KernelResponse::Result(result),
                        Err(e) => KernelResponse::Error { message: e.to_string() },
                    }
                }
                None => KernelResponse::Error { message: "kernel received Execute before Bootstrap".to_string() },
            },
            KernelRequest::Reset => match &executor {
                Some(exec) => match exec.reset().await {
                    Ok(()) => KernelResponse::Ok,
                    Err(e) => KernelResponse::Error { message: e.to_string() },
                },
                None => KernelResponse::Error { message: "kernel received Reset before Bootstrap".to_string() },
            },
        };

        if write_line(&mut stdout, &response).await.is_err() {
            break;
        }
    }

    Ok(())
}
