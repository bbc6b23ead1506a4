//! Executors (spec §4.G): the common `Executor` contract plus three
//! implementations trading isolation for overhead — in-process, a
//! subprocess kernel, and a containerized session server.
//!
//! Grounded in the engine/executor split the teacher already has
//! (`SkillExecutor::load` building a fresh `Store`+`Linker` per call),
//! generalized from one-shot WASM component instantiation to a long-lived
//! `mlua::Lua` whose globals table *is* the namespace dict (in-process), a
//! genuinely persistent child process speaking newline-JSON-RPC over stdio
//! (subprocess), and `skill-runtime::docker_runtime::DockerRuntime`'s
//! "shell out to docker, poll until ready" idiom generalized from a
//! throwaway tool container to a long-lived session-server container.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use mlua::Lua;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::bootstrap::{bootstrap_namespaces, bootstrap_with_storage, BootstrapConfig};
use crate::deps::DepsConfig;
use crate::embeddings::EmbeddingProvider;
use crate::errors::{ErrorKind, Result, RuntimeError};
use crate::namespace::NamespaceDict;
use crate::types::ExecutionResult;
use skill_context::Storage;

/// Capability vocabulary (spec §4.G): a flat set of strings every executor
/// declares, so callers gate behavior with `supports("timeout")` rather
/// than matching on a concrete executor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Timeout,
    ProcessIsolation,
    ContainerIsolation,
    NetworkIsolation,
    Reset,
    DepsInstall,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Timeout => "timeout",
            Capability::ProcessIsolation => "process_isolation",
            Capability::ContainerIsolation => "container_isolation",
            Capability::NetworkIsolation => "network_isolation",
            Capability::Reset => "reset",
            Capability::DepsInstall => "deps_install",
        }
    }
}

/// Common executor contract (spec §4.G). `start` is intentionally not part
/// of the trait: each implementation's constructor plays that role, since
/// the inputs required to start differ too much (a live `Storage` handle
/// in-process vs. a `BootstrapConfig` to ship across a process boundary)
/// to share one signature usefully.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Run `code`, returning a contained [`ExecutionResult`] for user-code
    /// failures (syntax/runtime/timeout/tool/skill errors) and raising a
    /// [`RuntimeError`] only for infrastructure faults
    /// (`ExecutorUnavailable`, `TransportError`, `ExecutorClosed`).
    async fn execute(&self, code: &str, timeout: Option<Duration>) -> Result<ExecutionResult>;
    /// Discard user bindings, preserving `tools`/`skills`/`artifacts`/`deps`.
    async fn reset(&self) -> Result<()>;
    /// Release underlying resources. Idempotent.
    async fn close(&self) -> Result<()>;
    /// The capability set this executor currently advertises.
    fn capabilities(&self) -> HashSet<Capability>;

    fn supports(&self, cap: Capability) -> bool {
        self.capabilities().contains(&cap)
    }
}

fn check_not_closed(closed: &AtomicBool) -> Result<()> {
    if closed.load(Ordering::SeqCst) {
        return Err(RuntimeError::ExecutorClosed);
    }
    Ok(())
}

// ---------------------------------------------------------------------
// In-process executor (§4.G.1)
// ---------------------------------------------------------------------

/// A single long-lived `mlua::Lua` instance whose globals table is the
/// namespace dict. `Lua::sandbox(true)` plus a conservative memory limit
/// stand in for the teacher's WASI capability restriction as the
/// in-process isolation boundary; cooperative timeout uses `mlua`'s
/// interrupt hook, the closest Rust-Lua analogue to WASI fuel-based
/// "best effort" cancellation.
pub struct InProcessExecutor {
    lua: Mutex<Lua>,
    namespaces: NamespaceDict,
    closed: AtomicBool,
    memory_limit: Option<usize>,
    stdout: Arc<StdMutex<String>>,
    stderr: Arc<StdMutex<String>>,
}

/// Bytes; keeps a runaway agent chunk from growing the host process
/// without bound. 256 MiB is generous for a scripting sandbox and cheap
/// to raise per-deployment if it proves too tight.
const DEFAULT_MEMORY_LIMIT: usize = 256 * 1024 * 1024;

impl InProcessExecutor {
    /// Build and bootstrap a fresh executor against an already-open
    /// [`Storage`] handle — the in-process path never needs to reopen its
    /// own store from a descriptor.
    pub async fn start(
        storage: Arc<dyn Storage>,
        tools_path: &std::path::Path,
        deps_config: &DepsConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self> {
        let namespaces =
            bootstrap_with_storage(storage, tools_path, deps_config, embedder, tokio::runtime::Handle::current())
                .await?;
        Self::from_namespaces(namespaces)
    }

    /// Builds and bootstraps a fresh executor from a [`BootstrapConfig`],
    /// reopening storage from its descriptor. Used by the `skill-kernel`
    /// binary after it reads the bootstrap message off stdin — the
    /// subprocess side of the cross-process bootstrap guarantee (§4.H).
    pub async fn from_bootstrap_config(
        config: &BootstrapConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self> {
        let namespaces = bootstrap_namespaces(config, embedder, tokio::runtime::Handle::current()).await?;
        Self::from_namespaces(namespaces)
    }

    pub(crate) fn from_namespaces(namespaces: NamespaceDict) -> Result<Self> {
        let lua = Lua::new();
        namespaces.install(&lua)?;
        let stdout = Arc::new(StdMutex::new(String::new()));
        let stderr = Arc::new(StdMutex::new(String::new()));
        Self::install_output_capture(&lua, stdout.clone(), stderr.clone())?;
        Ok(Self {
            lua: Mutex::new(lua),
            namespaces,
            closed: AtomicBool::new(false),
            memory_limit: Some(DEFAULT_MEMORY_LIMIT),
            stdout,
            stderr,
        })
    }

    fn install_interrupt(lua: &Lua, deadline: std::time::Instant) {
        lua.set_interrupt(move |_| {
            if std::time::Instant::now() >= deadline {
                Ok(mlua::VmState::Yield)
            } else {
                Ok(mlua::VmState::Continue)
            }
        });
    }

    /// Overrides `print` and `io.stderr:write` so a chunk's output lands in
    /// `stdout`/`stderr` buffers instead of the host process's real streams
    /// (spec §4.G.1 — executed code runs headless, its output is relayed
    /// back through `ExecutionResult`, never printed to the service's own
    /// terminal). Re-installed on every fresh `Lua` (initial construction
    /// and `reset`), since neither override survives a new interpreter.
    fn install_output_capture(lua: &Lua, stdout: Arc<StdMutex<String>>, stderr: Arc<StdMutex<String>>) -> Result<()> {
        let print = lua
            .create_function(move |lua, args: mlua::MultiValue| {
                let tostring: mlua::Function = lua.globals().get("tostring")?;
                let mut parts = Vec::with_capacity(args.len());
                for v in args {
                    parts.push(tostring.call::<String>(v)?);
                }
                let mut buf = stdout.lock().unwrap();
                buf.push_str(&parts.join("\t"));
                buf.push('\n');
                Ok(())
            })
            .map_err(RuntimeError::Lua)?;
        lua.globals().set("print", print).map_err(RuntimeError::Lua)?;

        if let Ok(io) = lua.globals().get::<mlua::Table>("io") {
            let stderr_proxy = lua.create_table().map_err(RuntimeError::Lua)?;
            let write = lua
                .create_function(move |lua, args: mlua::MultiValue| {
                    let tostring: mlua::Function = lua.globals().get("tostring")?;
                    let mut buf = stderr.lock().unwrap();
                    for v in args {
                        // `stderr:write(...)` passes the receiver table itself
                        // as the first argument; skip it.
                        if matches!(v, mlua::Value::Table(_)) {
                            continue;
                        }
                        buf.push_str(&tostring.call::<String>(v)?);
                    }
                    Ok(())
                })
                .map_err(RuntimeError::Lua)?;
            stderr_proxy.set("write", write).map_err(RuntimeError::Lua)?;
            io.set("stderr", stderr_proxy).map_err(RuntimeError::Lua)?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Executor for InProcessExecutor {
    async fn execute(&self, code: &str, timeout: Option<Duration>) -> Result<ExecutionResult> {
        check_not_closed(&self.closed)?;
        let lua = self.lua.lock().await;

        if let Some(limit) = self.memory_limit {
            let _ = lua.set_memory_limit(limit);
        }
        if let Some(t) = timeout {
            Self::install_interrupt(&lua, std::time::Instant::now() + t);
        } else {
            lua.remove_interrupt();
        }

        self.stdout.lock().unwrap().clear();
        self.stderr.lock().unwrap().clear();

        let started = std::time::Instant::now();
        let chunk = lua.load(code);
        let eval: mlua::Result<mlua::MultiValue> = chunk.eval_async().await;
        lua.remove_interrupt();
        let duration_ms = started.elapsed().as_millis() as u64;
        let stdout = self.stdout.lock().unwrap().clone();
        let stderr = self.stderr.lock().unwrap().clone();

        match eval {
            Ok(values) => {
                let value = values
                    .into_iter()
                    .next()
                    .map(|v| lua.from_value::<serde_json::Value>(v).unwrap_or(serde_json::Value::Null))
                    .unwrap_or(serde_json::Value::Null);
                Ok(ExecutionResult::ok(value, stdout, stderr, duration_ms))
            }
            Err(mlua::Error::CoroutineInactive) | Err(mlua::Error::MemoryError(_)) => {
                Ok(ExecutionResult::failed(
                    ErrorKind::Timeout,
                    "execution exceeded its timeout",
                    stdout,
                    stderr,
                    duration_ms,
                ))
            }
            Err(e) => {
                let kind = classify_lua_error(&e);
                Ok(ExecutionResult::failed(kind, e.to_string(), stdout, stderr, duration_ms))
            }
        }
    }

    async fn reset(&self) -> Result<()> {
        check_not_closed(&self.closed)?;
        let lua = Lua::new();
        self.namespaces.install(&lua)?;
        Self::install_output_capture(&lua, self.stdout.clone(), self.stderr.clone())?;
        *self.lua.lock().await = lua;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn capabilities(&self) -> HashSet<Capability> {
        let mut caps = HashSet::from([Capability::Reset, Capability::DepsInstall]);
        // `set_interrupt` is always installable on this mlua build, so
        // timeout support is unconditional here; a future build targeting
        // a Lua flavor without yieldable interrupts would omit this.
        caps.insert(Capability::Timeout);
        caps
    }
}

fn classify_lua_error(e: &mlua::Error) -> ErrorKind {
    match e {
        mlua::Error::SyntaxError { .. } => ErrorKind::SyntaxError,
        _ => ErrorKind::RuntimeError,
    }
}

// ---------------------------------------------------------------------
// Subprocess-kernel executor (§4.G.2)
// ---------------------------------------------------------------------

/// Wire messages exchanged with `skill-kernel` over newline-delimited
/// stdio JSON, mirroring the RPC-stdio tool adapter's framing (§4.B).
/// Public so the `skill-kernel` binary (a separate binary crate target)
/// can speak the same protocol from the other end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelRequest {
    Bootstrap { config: BootstrapConfig },
    Execute { code: String, timeout_ms: Option<u64> },
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelResponse {
    Ready,
    Result(ExecutionResult),
    Ok,
    Error { message: String },
}

struct KernelProcess {
    child: Child,
    stdin: tokio::process::ChildStdin,
    stdout: BufReader<tokio::process::ChildStdout>,
}

/// Spawns a child running the `skill-kernel` binary and drives it over a
/// strictly-ordered request/response channel — one `execute` must
/// complete before the next is sent, mirroring §5's per-executor
/// serialization.
pub struct SubprocessExecutor {
    kernel_path: PathBuf,
    config: BootstrapConfig,
    startup_timeout: Duration,
    grace_period: Duration,
    process: Mutex<Option<KernelProcess>>,
    closed: AtomicBool,
}

impl SubprocessExecutor {
    pub async fn start(kernel_path: PathBuf, config: BootstrapConfig, startup_timeout: Duration) -> Result<Self> {
        let executor = Self {
            kernel_path,
            config,
            startup_timeout,
            grace_period: Duration::from_secs(2),
            process: Mutex::new(None),
            closed: AtomicBool::new(false),
        };
        executor.spawn_and_bootstrap().await?;
        Ok(executor)
    }

    async fn spawn_and_bootstrap(&self) -> Result<()> {
        let mut child = Command::new(&self.kernel_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::ExecutorUnavailable(e.to_string()))?;

        let mut stdin = child.stdin.take().ok_or_else(|| RuntimeError::ExecutorUnavailable("no stdin".into()))?;
        let mut stdout = BufReader::new(child.stdout.take().ok_or_else(|| RuntimeError::ExecutorUnavailable("no stdout".into()))?);

        let ready = tokio::time::timeout(self.startup_timeout, read_response(&mut stdout));
        match ready.await {
            Ok(Ok(KernelResponse::Ready)) => {}
            Ok(Ok(_)) => return Err(RuntimeError::ExecutorUnavailable("kernel sent unexpected message before Ready".into())),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(RuntimeError::ExecutorUnavailable("kernel did not signal readiness within startup_timeout".into())),
        }

        send_request(&mut stdin, &KernelRequest::Bootstrap { config: self.config.clone() }).await?;
        match read_response(&mut stdout).await? {
            KernelResponse::Ok => {}
            KernelResponse::Error { message } => return Err(RuntimeError::ExecutorUnavailable(message)),
            _ => return Err(RuntimeError::ExecutorUnavailable("unexpected bootstrap response".into())),
        }

        *self.process.lock().await = Some(KernelProcess { child, stdin, stdout });
        Ok(())
    }

    async fn kill_current(&self, proc: &mut KernelProcess) {
        let _ = proc.child.start_kill();
        let _ = tokio::time::timeout(self.grace_period, proc.child.wait()).await;
    }
}

async fn send_request(stdin: &mut tokio::process::ChildStdin, req: &KernelRequest) -> Result<()> {
    write_line(stdin, req).await
}

/// Writes one newline-terminated JSON value to an async writer. Shared by
/// the executor side (writing requests, reading responses) and by
/// `skill-kernel` (writing responses, reading requests) — same framing,
/// opposite direction.
pub async fn write_line<T: Serialize>(mut writer: impl tokio::io::AsyncWrite + Unpin, value: &T) -> Result<()> {
    let mut line = serde_json::to_vec(value).map_err(|e| RuntimeError::TransportError(e.to_string()))?;
    line.push(b'\n');
    writer.write_all(&line).await.map_err(|e| RuntimeError::TransportError(e.to_string()))?;
    writer.flush().await.map_err(|e| RuntimeError::TransportError(e.to_string()))?;
    Ok(())
}

async fn read_response(stdout: &mut BufReader<tokio::process::ChildStdout>) -> Result<KernelResponse> {
    read_line(stdout).await
}

/// Reads one newline-terminated JSON value from an async reader.
pub async fn read_line<T: serde::de::DeserializeOwned>(mut reader: impl tokio::io::AsyncBufRead + Unpin) -> Result<T> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.map_err(|e| RuntimeError::TransportError(e.to_string()))?;
    if n == 0 {
        return Err(RuntimeError::ExecutorUnavailable("peer closed its stream".into()));
    }
    serde_json::from_str(line.trim_end()).map_err(|e| RuntimeError::TransportError(e.to_string()))
}

#[async_trait::async_trait]
impl Executor for SubprocessExecutor {
    async fn execute(&self, code: &str, timeout: Option<Duration>) -> Result<ExecutionResult> {
        check_not_closed(&self.closed)?;
        let mut guard = self.process.lock().await;
        let proc = guard.as_mut().ok_or(RuntimeError::ExecutorUnavailable("kernel not running".into()))?;

        send_request(
            &mut proc.stdin,
            &KernelRequest::Execute { code: code.to_string(), timeout_ms: timeout.map(|t| t.as_millis() as u64) },
        )
        .await?;

        let read = read_response(&mut proc.stdout);
        let outcome = match timeout {
            Some(t) => tokio::time::timeout(t + self.grace_period, read).await,
            None => Ok(read.await),
        };

        match outcome {
            Ok(Ok(KernelResponse::Result(result))) => Ok(result),
            Ok(Ok(KernelResponse::Error { message })) => Err(RuntimeError::TransportError(message)),
            Ok(Ok(_)) => Err(RuntimeError::TransportError("unexpected kernel response".into())),
            Ok(Err(e)) => {
                // Stdout closed or malformed; the kernel is unusable, kill
                // and restart so a subsequent call can still succeed.
                self.kill_current(proc).await;
                drop(guard);
                self.spawn_and_bootstrap().await?;
                Err(e)
            }
            Err(_) => {
                // Grace period elapsed with no response: kill, restart,
                // and report Timeout. State is lost, matching spec §4.G.2.
                self.kill_current(proc).await;
                drop(guard);
                self.spawn_and_bootstrap().await?;
                Ok(ExecutionResult::failed(
                    ErrorKind::Timeout,
                    "kernel did not respond within timeout + grace period; restarted",
                    String::new(),
                    String::new(),
                    timeout.map(|t| t.as_millis() as u64).unwrap_or(0),
                ))
            }
        }
    }

    async fn reset(&self) -> Result<()> {
        check_not_closed(&self.closed)?;
        self.spawn_and_bootstrap().await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(mut proc) = self.process.lock().await.take() {
            self.kill_current(&mut proc).await;
        }
        Ok(())
    }

    fn capabilities(&self) -> HashSet<Capability> {
        HashSet::from([Capability::Timeout, Capability::ProcessIsolation, Capability::Reset, Capability::DepsInstall])
    }
}

// ---------------------------------------------------------------------
// Container executor (§4.G.3)
// ---------------------------------------------------------------------

/// Resource limits applied to the container, generalized from
/// `DockerRuntime::DockerSecurityPolicy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerLimits {
    pub memory: Option<String>,
    pub cpus: Option<String>,
    pub network_disabled: bool,
}

/// Runs the session server (§4.I) as a long-lived container and speaks
/// HTTP to it. Grounded in `DockerRuntime::build_command`/`execute`,
/// generalized from a throwaway per-tool-call container to one container
/// per session lifetime, polled for `/health` the same way
/// `DockerRuntime::ensure_image` polls docker state before proceeding.
pub struct ContainerExecutor {
    client: reqwest::Client,
    base_url: String,
    token: String,
    container_id: Mutex<Option<String>>,
    closed: AtomicBool,
    network_isolated: bool,
}

impl ContainerExecutor {
    pub async fn start(
        image: &str,
        host_port: u16,
        token: String,
        config: &BootstrapConfig,
        limits: ContainerLimits,
        startup_timeout: Duration,
    ) -> Result<Self> {
        let storage_access_json = serde_json::to_string(&config.storage_access)
            .map_err(|e| RuntimeError::ExecutorUnavailable(e.to_string()))?;
        let deps_config_json = serde_json::to_string(&config.deps_config)
            .map_err(|e| RuntimeError::ExecutorUnavailable(e.to_string()))?;

        let mut command = Command::new("docker");
        command
            .arg("run")
            .arg("-d")
            .args(["-p", &format!("{host_port}:8080")])
            .args(["-e", &format!("SKILL_AUTH_TOKEN={token}")])
            .args(["-e", &format!("SKILL_STORAGE_ACCESS={storage_access_json}")])
            .args(["-e", &format!("SKILL_DEPS_CONFIG={deps_config_json}")])
            .args(["-v", &format!("{}:/tools:ro", config.tools_path.display())]);

        if let Some(memory) = &limits.memory {
            command.args(["--memory", memory]);
        }
        if let Some(cpus) = &limits.cpus {
            command.args(["--cpus", cpus]);
        }
        if limits.network_disabled {
            command.args(["--network", "none"]);
        }
        command.arg(image);

        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RuntimeError::ExecutorUnavailable(format!("failed to run docker: {e}")))?;

        if !output.status.success() {
            return Err(RuntimeError::ExecutorUnavailable(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();

        let client = reqwest::Client::new();
        let base_url = format!("http://127.0.0.1:{host_port}");
        let executor = Self {
            client,
            base_url,
            token,
            container_id: Mutex::new(Some(container_id)),
            closed: AtomicBool::new(false),
            network_isolated: limits.network_disabled,
        };
        executor.wait_healthy(startup_timeout).await?;
        Ok(executor)
    }

    async fn wait_healthy(&self, startup_timeout: Duration) -> Result<()> {
        let deadline = std::time::Instant::now() + startup_timeout;
        loop {
            let resp = self
                .client
                .get(format!("{}/health", self.base_url))
                .bearer_auth(&self.token)
                .send()
                .await;
            if let Ok(resp) = resp {
                if resp.status().is_success() {
                    if let Ok(body) = resp.json::<serde_json::Value>().await {
                        if body.get("status").and_then(|s| s.as_str()) == Some("healthy") {
                            return Ok(());
                        }
                    }
                }
            }
            if std::time::Instant::now() >= deadline {
                return Err(RuntimeError::ExecutorUnavailable(
                    "container did not become healthy within startup_timeout".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }
}

#[async_trait::async_trait]
impl Executor for ContainerExecutor {
    async fn execute(&self, code: &str, timeout: Option<Duration>) -> Result<ExecutionResult> {
        check_not_closed(&self.closed)?;
        let body = serde_json::json!({
            "code": code,
            "timeout": timeout.map(|t| t.as_secs_f64()),
        });
        let resp = self
            .client
            .post(format!("{}/execute", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RuntimeError::TransportError(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Ok(ExecutionResult::failed(ErrorKind::Timeout, "execution timed out", String::new(), String::new(), 0));
        }
        resp.json::<ExecutionResult>().await.map_err(|e| RuntimeError::TransportError(e.to_string()))
    }

    async fn reset(&self) -> Result<()> {
        check_not_closed(&self.closed)?;
        self.client
            .post(format!("{}/reset", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RuntimeError::TransportError(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(id) = self.container_id.lock().await.take() {
            let _ = Command::new("docker").args(["rm", "-f", &id]).stdout(Stdio::null()).stderr(Stdio::null()).status().await;
        }
        Ok(())
    }

    fn capabilities(&self) -> HashSet<Capability> {
        let mut caps = HashSet::from([
            Capability::Timeout,
            Capability::ProcessIsolation,
            Capability::ContainerIsolation,
            Capability::Reset,
            Capability::DepsInstall,
        ]);
        if self.network_isolated {
            caps.insert(Capability::NetworkIsolation);
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DepsPolicy;
    use skill_context::FileStorage;

    async fn in_process(dir: &std::path::Path) -> InProcessExecutor {
        let tools_dir = dir.join("tools");
        std::fs::create_dir_all(&tools_dir).unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.join("store")).unwrap());
        let deps_config = DepsConfig { policy: DepsPolicy::Allow, ..Default::default() };
        InProcessExecutor::start(storage, &tools_dir, &deps_config, None).await.unwrap()
    }

    /// I1 + I4: consecutive `execute` calls share state and `value`
    /// reflects the last expression.
    #[tokio::test]
    async fn i1_i4_execute_shares_state_and_returns_last_expression() {
        let dir = tempfile::tempdir().unwrap();
        let executor = in_process(dir.path()).await;

        let r1 = executor.execute("x = 42", None).await.unwrap();
        assert!(r1.error.is_none());

        let r2 = executor.execute("x + 1", None).await.unwrap();
        assert!(r2.error.is_none());
        assert_eq!(r2.value, serde_json::json!(43));
    }

    /// I5: reset clears user bindings but preserves the namespace globals.
    #[tokio::test]
    async fn i5_reset_clears_bindings_preserves_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let executor = in_process(dir.path()).await;

        executor.execute("x = 1", None).await.unwrap();
        executor.reset().await.unwrap();

        let r = executor.execute("x", None).await.unwrap();
        assert_eq!(r.value, serde_json::Value::Null);

        let r2 = executor.execute("type(tools)", None).await.unwrap();
        assert_eq!(r2.value, serde_json::json!("userdata"));
    }

    /// I10: any method after close raises ExecutorClosed.
    #[tokio::test]
    async fn i10_methods_after_close_raise_executor_closed() {
        let dir = tempfile::tempdir().unwrap();
        let executor = in_process(dir.path()).await;
        executor.close().await.unwrap();

        assert!(matches!(executor.execute("1", None).await, Err(RuntimeError::ExecutorClosed)));
        assert!(matches!(executor.reset().await, Err(RuntimeError::ExecutorClosed)));
        // close is idempotent
        assert!(executor.close().await.is_ok());
    }

    #[tokio::test]
    async fn syntax_error_is_contained_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let executor = in_process(dir.path()).await;
        let r = executor.execute("this is not lua (((", None).await.unwrap();
        assert_eq!(r.error.as_ref().unwrap().kind, ErrorKind::SyntaxError);
    }

    #[tokio::test]
    async fn capabilities_include_timeout_reset_deps_install() {
        let dir = tempfile::tempdir().unwrap();
        let executor = in_process(dir.path()).await;
        assert!(executor.supports(Capability::Reset));
        assert!(executor.supports(Capability::DepsInstall));
        assert!(executor.supports(Capability::Timeout));
        assert!(!executor.supports(Capability::ContainerIsolation));
    }

    /// `print` output is captured into `ExecutionResult.stdout`, not lost.
    #[tokio::test]
    async fn execute_captures_stdout_from_print() {
        let dir = tempfile::tempdir().unwrap();
        let executor = in_process(dir.path()).await;
        let r = executor.execute("print('hello', 1)", None).await.unwrap();
        assert!(r.error.is_none());
        assert_eq!(r.stdout, "hello\t1\n");

        // Each call's buffer starts clean; the prior call's output doesn't leak.
        let r2 = executor.execute("1 + 1", None).await.unwrap();
        assert_eq!(r2.stdout, "");
    }

    /// S4: a timed-out execution returns well within the scenario's 2s
    /// budget, and the executor is still usable afterward.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn s4_timeout_returns_and_executor_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let executor = in_process(dir.path()).await;

        let started = std::time::Instant::now();
        let r = executor.execute("while true do end", Some(Duration::from_millis(100))).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(r.value, serde_json::Value::Null);
        assert_eq!(r.error.as_ref().unwrap().kind, ErrorKind::Timeout);

        let r2 = executor.execute("1 + 1", None).await.unwrap();
        assert!(r2.error.is_none());
        assert_eq!(r2.value, serde_json::json!(2));
    }
}
