//! Tool adapters and the registry that routes `tools.X.Y(...)` calls to them
//! (spec §4.B).
//!
//! Three adapter kinds share one trait: a CLI adapter that spawns a child
//! process per call (grounded in `DockerRuntime::execute`'s spawn-capture-wait
//! shape, generalized to an arbitrary configured `command`), an RPC-stdio
//! adapter that keeps one child process alive per adapter and speaks
//! newline-framed JSON-RPC over its stdio, and an HTTP adapter built on
//! `reqwest`. A [`ToolRegistry`] loads tool definitions from a directory,
//! rejects duplicate tool names at registration, and dispatches `call`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::cli_tool::CliToolDefinition;
use crate::errors::{Result, RuntimeError};
use crate::types::{InvocationBinding, Parameter, ParameterType, Tool, ToolCallable};

/// Common contract over the three adapter kinds (spec §4.B).
#[async_trait::async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Tools exposed by this adapter.
    async fn list_tools(&self) -> Result<Vec<Tool>>;
    /// Invoke a recipe (or, when `recipe_name` is `None`, the escape hatch)
    /// on `tool_name` with `args`.
    async fn call(&self, tool_name: &str, recipe_name: Option<&str>, args: HashMap<String, Value>) -> Result<Value>;
    /// Release any held resources (child processes, connections).
    async fn close(&self) -> Result<()>;
}

// ---------------------------------------------------------------------
// CLI adapter
// ---------------------------------------------------------------------

/// Loads CLI tool definitions from a directory of YAML files (one tool per
/// file) and executes recipe/escape-hatch invocations as child processes.
pub struct CliAdapter {
    tools: HashMap<String, CliToolDefinition>,
}

impl CliAdapter {
    /// Load every `*.yaml`/`*.yml` file in `dir` whose `type` field is absent
    /// or `cli`.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut tools = HashMap::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self { tools });
            }
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !matches!(ext, Some("yaml") | Some("yml")) {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            if discriminator(&content) != ToolFileKind::Cli {
                continue;
            }
            let def = CliToolDefinition::from_yaml(&content)?;
            if tools.insert(def.name.clone(), def).is_some() {
                return Err(RuntimeError::DuplicateTool(
                    path.display().to_string(),
                ));
            }
        }
        Ok(Self { tools })
    }

    fn definition(&self, name: &str) -> Result<&CliToolDefinition> {
        self.tools
            .get(name)
            .ok_or_else(|| RuntimeError::NotFound(format!("tool '{name}'")))
    }
}

#[async_trait::async_trait]
impl ToolAdapter for CliAdapter {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(self.tools.values().map(cli_tool_descriptor).collect())
    }

    async fn call(&self, tool_name: &str, recipe_name: Option<&str>, args: HashMap<String, Value>) -> Result<Value> {
        let def = self.definition(tool_name)?;
        let argv = match recipe_name {
            Some(recipe) => def.build_recipe_argv(recipe, &args)?,
            None => def.build_escape_hatch_argv(&args)?,
        };

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|e| RuntimeError::ToolExecutionError { exit_code: None, stderr_tail: e.to_string() })?;
        let pid = child.id();

        let timeout = Duration::from_secs(def.timeout);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| RuntimeError::ToolExecutionError {
                exit_code: None,
                stderr_tail: e.to_string(),
            })?,
            Err(_) => {
                kill_process_group(pid);
                return Err(RuntimeError::ToolTimeout(timeout));
            }
        };

        if !output.status.success() {
            let stderr_tail = tail(&String::from_utf8_lossy(&output.stderr), 2048);
            return Err(RuntimeError::ToolExecutionError {
                exit_code: output.status.code(),
                stderr_tail,
            });
        }

        Ok(Value::String(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn cli_tool_descriptor(def: &CliToolDefinition) -> Tool {
    let mut callables: Vec<ToolCallable> = def
        .recipes
        .iter()
        .map(|(recipe_name, recipe)| ToolCallable {
            name: recipe_name.clone(),
            description: recipe.description.clone(),
            parameters: recipe
                .params
                .keys()
                .map(|name| Parameter {
                    name: name.clone(),
                    param_type: ParameterType::String,
                    required: false,
                    default: recipe.params.get(name).and_then(|p| p.default.clone()),
                })
                .collect(),
            binding: InvocationBinding {
                adapter: "cli".to_string(),
                tool: def.name.clone(),
                recipe: Some(recipe_name.clone()),
            },
        })
        .collect();
    callables.sort_by(|a, b| a.name.cmp(&b.name));
    Tool {
        name: def.name.clone(),
        description: def.description.clone(),
        tags: def.tags.clone(),
        callables,
    }
}

fn tail(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        s.to_string()
    } else {
        s[s.len() - max_bytes..].to_string()
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

// ---------------------------------------------------------------------
// RPC-stdio (MCP-style) adapter
// ---------------------------------------------------------------------

/// A single declared method on an RPC-stdio tool — the RPC analogue of a CLI
/// recipe.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcMethod {
    pub description: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Definition of an RPC-stdio tool, loaded from a `type: mcp` YAML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub methods: HashMap<String, RpcMethod>,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    id: u64,
    method: &'a str,
    params: &'a HashMap<String, Value>,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[allow(dead_code)]
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

struct RpcChannel {
    child: Child,
    stdin: tokio::process::ChildStdin,
    stdout: BufReader<tokio::process::ChildStdout>,
}

/// Launches one child process per adapter and speaks newline-framed JSON-RPC
/// over its stdio. Calls are serialized through `channel`'s lock (spec §5:
/// "each adapter owns a lock that serializes requests over its single stdio
/// channel"). A dead child is respawned transparently on the next call.
pub struct RpcStdioAdapter {
    def: RpcToolDefinition,
    channel: Mutex<Option<RpcChannel>>,
    next_id: AtomicU64,
}

impl RpcStdioAdapter {
    pub fn new(def: RpcToolDefinition) -> Self {
        Self {
            def,
            channel: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    async fn spawn(&self) -> Result<RpcChannel> {
        let mut child = Command::new(&self.def.command)
            .args(&self.def.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RuntimeError::ExecutorUnavailable(e.to_string()))?;
        let stdin = child.stdin.take().ok_or_else(|| RuntimeError::ExecutorUnavailable("no stdin".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| RuntimeError::ExecutorUnavailable("no stdout".into()))?;
        Ok(RpcChannel { child, stdin, stdout: BufReader::new(stdout) })
    }

    async fn request(&self, method: &str, params: &HashMap<String, Value>) -> Result<Value> {
        let mut guard = self.channel.lock().await;
        if guard.is_none() || guard.as_mut().unwrap().child.try_wait().ok().flatten().is_some() {
            *guard = Some(self.spawn().await?);
        }
        let channel = guard.as_mut().unwrap();

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest { id, method, params };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        channel
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| RuntimeError::TransportError(e.to_string()))?;

        let mut response_line = String::new();
        channel
            .stdout
            .read_line(&mut response_line)
            .await
            .map_err(|e| RuntimeError::TransportError(e.to_string()))?;
        if response_line.is_empty() {
            *guard = None;
            return Err(RuntimeError::TransportError("RPC child closed stdout".into()));
        }

        let response: RpcResponse = serde_json::from_str(response_line.trim())
            .map_err(|e| RuntimeError::TransportError(format!("malformed RPC response: {e}")))?;
        match response.error {
            Some(message) => Err(RuntimeError::ToolExecutionError { exit_code: None, stderr_tail: message }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        }
    }
}

#[async_trait::async_trait]
impl ToolAdapter for RpcStdioAdapter {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut callables: Vec<ToolCallable> = self
            .def
            .methods
            .iter()
            .map(|(name, method)| ToolCallable {
                name: name.clone(),
                description: method.description.clone(),
                parameters: method
                    .params
                    .iter()
                    .map(|p| Parameter { name: p.clone(), param_type: ParameterType::String, required: false, default: None })
                    .collect(),
                binding: InvocationBinding { adapter: "rpc-stdio".to_string(), tool: self.def.name.clone(), recipe: Some(name.clone()) },
            })
            .collect();
        callables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vec![Tool {
            name: self.def.name.clone(),
            description: self.def.description.clone(),
            tags: self.def.tags.clone(),
            callables,
        }])
    }

    async fn call(&self, _tool_name: &str, recipe_name: Option<&str>, args: HashMap<String, Value>) -> Result<Value> {
        let method = recipe_name.ok_or_else(|| RuntimeError::NotFound("RPC tools require a method name".into()))?;
        self.request(method, &args).await
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.channel.lock().await;
        if let Some(mut channel) = guard.take() {
            let _ = channel.child.kill().await;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------
// HTTP adapter
// ---------------------------------------------------------------------

/// One HTTP endpoint — the HTTP analogue of a CLI recipe.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpEndpoint {
    pub method: String,
    pub path_template: String,
    #[serde(default)]
    pub description: String,
}

/// Definition of an HTTP tool, loaded from a `type: http` YAML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub base_url: String,
    #[serde(default)]
    pub endpoints: HashMap<String, HttpEndpoint>,
}

/// Executes `HttpEndpoint`s against `base_url` with `reqwest`. Path
/// parameters come from keyword args; an optional `query_params` mapping
/// passes the rest as a query string.
pub struct HttpAdapter {
    def: HttpToolDefinition,
    client: reqwest::Client,
}

impl HttpAdapter {
    pub fn new(def: HttpToolDefinition) -> Self {
        Self { def, client: reqwest::Client::new() }
    }
}

#[async_trait::async_trait]
impl ToolAdapter for HttpAdapter {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut callables: Vec<ToolCallable> = self
            .def
            .endpoints
            .iter()
            .map(|(name, endpoint)| ToolCallable {
                name: name.clone(),
                description: endpoint.description.clone(),
                parameters: Vec::new(),
                binding: InvocationBinding { adapter: "http".to_string(), tool: self.def.name.clone(), recipe: Some(name.clone()) },
            })
            .collect();
        callables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vec![Tool {
            name: self.def.name.clone(),
            description: self.def.description.clone(),
            tags: self.def.tags.clone(),
            callables,
        }])
    }

    async fn call(&self, _tool_name: &str, recipe_name: Option<&str>, mut args: HashMap<String, Value>) -> Result<Value> {
        let recipe = recipe_name.ok_or_else(|| RuntimeError::NotFound("HTTP tools require an endpoint name".into()))?;
        let endpoint = self
            .def
            .endpoints
            .get(recipe)
            .ok_or_else(|| RuntimeError::NotFound(format!("endpoint '{recipe}'")))?;

        let query_params = args.remove("query_params").and_then(|v| v.as_object().cloned());

        let mut path = endpoint.path_template.clone();
        for (key, value) in &args {
            let placeholder = format!("{{{key}}}");
            if path.contains(&placeholder) {
                path = path.replace(&placeholder, &scalar_to_str(value));
            }
        }
        let url = format!("{}{}", self.def.base_url.trim_end_matches('/'), path);

        let method = reqwest::Method::from_bytes(endpoint.method.as_bytes())
            .map_err(|_| RuntimeError::SchemaError(format!("invalid HTTP method '{}'", endpoint.method)))?;
        let mut request = self.client.request(method, &url);
        if let Some(query) = query_params {
            let pairs: Vec<(String, String)> = query.iter().map(|(k, v)| (k.clone(), scalar_to_str(v))).collect();
            request = request.query(&pairs);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RuntimeError::TransportError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RuntimeError::ToolExecutionError {
                exit_code: Some(status.as_u16() as i32),
                stderr_tail: tail(&body, 2048),
            });
        }
        let body = response.text().await.map_err(|e| RuntimeError::TransportError(e.to_string()))?;
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn scalar_to_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------
// Loading & registry
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolFileKind {
    Cli,
    Mcp,
    Http,
}

#[derive(Deserialize)]
struct TypeDiscriminator {
    #[serde(default)]
    r#type: Option<String>,
}

fn discriminator(content: &str) -> ToolFileKind {
    match serde_yaml::from_str::<TypeDiscriminator>(content).ok().and_then(|d| d.r#type) {
        Some(t) if t == "mcp" => ToolFileKind::Mcp,
        Some(t) if t == "http" => ToolFileKind::Http,
        _ => ToolFileKind::Cli,
    }
}

/// Routes `tools.X.Y(...)` calls across however many adapters were loaded.
/// Tool names are unique across all adapters combined.
pub struct ToolRegistry {
    adapters: HashMap<String, Arc<dyn ToolAdapter>>,
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Load every adapter kind from `tools_path`: CLI tools (no `type` or
    /// `type: cli`), RPC-stdio tools (`type: mcp`), HTTP tools (`type: http`).
    pub async fn load_dir(tools_path: &Path) -> Result<Self> {
        let mut registry = Self { adapters: HashMap::new(), tools: HashMap::new() };

        let cli_adapter: Arc<dyn ToolAdapter> = Arc::new(CliAdapter::load_dir(tools_path)?);
        registry.register(cli_adapter).await?;

        let entries = match std::fs::read_dir(tools_path) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(registry),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !matches!(ext, Some("yaml") | Some("yml")) {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            match discriminator(&content) {
                ToolFileKind::Cli => continue,
                ToolFileKind::Mcp => {
                    let def: RpcToolDefinition = serde_yaml::from_str(&content)
                        .map_err(|e| RuntimeError::SchemaError(format!("invalid MCP tool YAML: {e}")))?;
                    let adapter: Arc<dyn ToolAdapter> = Arc::new(RpcStdioAdapter::new(def));
                    registry.register(adapter).await?;
                }
                ToolFileKind::Http => {
                    let def: HttpToolDefinition = serde_yaml::from_str(&content)
                        .map_err(|e| RuntimeError::SchemaError(format!("invalid HTTP tool YAML: {e}")))?;
                    let adapter: Arc<dyn ToolAdapter> = Arc::new(HttpAdapter::new(def));
                    registry.register(adapter).await?;
                }
            }
        }
        Ok(registry)
    }

    /// Build an empty registry (no tools path configured).
    pub fn empty() -> Self {
        Self { adapters: HashMap::new(), tools: HashMap::new() }
    }

    /// Register an adapter, indexing its tools by name. Fails with
    /// `DuplicateTool` if any tool name collides with an already-registered one.
    pub async fn register(&mut self, adapter: Arc<dyn ToolAdapter>) -> Result<()> {
        for tool in adapter.list_tools().await? {
            if self.tools.contains_key(&tool.name) {
                return Err(RuntimeError::DuplicateTool(tool.name));
            }
            self.adapters.insert(tool.name.clone(), adapter.clone());
            self.tools.insert(tool.name.clone(), tool);
        }
        Ok(())
    }

    /// Tool summaries for `tools.list()`.
    pub fn list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// `tools.search(query)`: keyword match over `name|description|tags`,
    /// deterministic tie-break by name.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Tool> {
        let query = query.to_lowercase();
        let mut scored: Vec<(i32, &Tool)> = self
            .tools
            .values()
            .filter_map(|tool| {
                let haystack = format!("{} {} {}", tool.name, tool.description, tool.tags.join(" ")).to_lowercase();
                if haystack.contains(&query) {
                    let score = if tool.name.to_lowercase().contains(&query) { 2 } else { 1 };
                    Some((score, tool))
                } else {
                    None
                }
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
        scored.into_iter().take(limit).map(|(_, t)| t.clone()).collect()
    }

    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Route a call to the owning adapter.
    pub async fn call(&self, tool_name: &str, recipe_name: Option<&str>, args: HashMap<String, Value>) -> Result<Value> {
        let adapter = self
            .adapters
            .get(tool_name)
            .ok_or_else(|| RuntimeError::NotFound(format!("tool '{tool_name}'")))?;
        adapter.call(tool_name, recipe_name, args).await
    }

    /// Close every distinct adapter exactly once.
    pub async fn close(&self) -> Result<()> {
        let mut closed = std::collections::HashSet::new();
        for adapter in self.adapters.values() {
            let ptr = Arc::as_ptr(adapter) as *const () as usize;
            if closed.insert(ptr) {
                adapter.close().await?;
            }
        }
        Ok(())
    }
}

/// Path-prefixed tools directory used by both in-process startup and
/// cross-process bootstrap (spec §4.H).
pub fn default_tools_path(base: &Path) -> PathBuf {
    base.join("tools")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_rejects_duplicate_tool_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "name: dup\ncommand: echo\nschema: {}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: dup\ncommand: echo\nschema: {}\n",
        )
        .unwrap();
        let err = ToolRegistry::load_dir(dir.path()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::DuplicateTool(_)));
    }

    #[tokio::test]
    async fn registry_lists_and_searches_cli_tools() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("curl.yaml"),
            r#"
name: curl
description: transfer data with URLs
tags: [http, network]
command: curl
schema:
  options:
    silent: { type: boolean, short: s }
  positional:
    - name: url
      required: true
recipes:
  get:
    description: GET a URL
    preset: { silent: true }
    params: { url: {} }
"#,
        )
        .unwrap();
        let registry = ToolRegistry::load_dir(dir.path()).await.unwrap();
        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.search("http", 5).len(), 1);
        assert_eq!(registry.search("nonexistent", 5).len(), 0);
    }
}
