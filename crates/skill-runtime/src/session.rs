//! The `Session` orchestrator (spec §4.J): the single facade consumers
//! (the CLI, the HTTP server, integration tests) drive instead of wiring
//! storage/bootstrap/executor together by hand.
//!
//! Grounded in `skill-http::server::AppState::new`'s "construct engine +
//! instance manager + loader, then optionally load a manifest" sequencing,
//! generalized into an RAII-scoped struct: `open()` builds storage, an
//! executor, and (if configured) syncs pre-declared deps before returning;
//! `Drop` closes the executor if the caller didn't already do so, mirroring
//! the teacher's cleanup-on-drop idiom.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::bootstrap::bootstrap_with_storage;
use crate::deps::{AddOutcome, DepsConfig, InstallReport};
use crate::embeddings::EmbeddingProvider;
use crate::errors::Result;
use crate::executor::{Capability, Executor, InProcessExecutor};
use crate::namespace::NamespaceDict;
use crate::skills::{SkillRecord, SkillSearchResult};
use crate::types::{ExecutionResult, Tool, ToolSummary};
use skill_context::{Artifact, ArtifactSummary, Dep, Storage, StorageAccess};

/// Construction inputs for a [`Session`]. `sync_deps_on_start` mirrors
/// spec §4.J / scenario S5: when set, `Session::open` calls
/// `deps.sync()` once before returning, regardless of `deps_config.policy`
/// (sync is always permitted).
pub struct SessionConfig {
    pub storage_access: StorageAccess,
    pub tools_path: PathBuf,
    pub deps_config: DepsConfig,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub sync_deps_on_start: bool,
}

/// An open session: a namespace dict (for facade calls) plus a running
/// executor (for `run`/`reset`/`close`). Both are bootstrapped from the
/// same storage and tools path, so facade reads/writes and `execute`'s
/// view of `tools`/`skills`/`artifacts`/`deps` always agree (spec §4.H's
/// reproducibility guarantee) without the facade needing to reach inside
/// whichever executor kind is in use.
pub struct Session {
    namespaces: NamespaceDict,
    executor: Arc<dyn Executor>,
    closed: std::sync::atomic::AtomicBool,
}

impl Session {
    /// Opens a session backed by an [`InProcessExecutor`]. Other executor
    /// kinds (`SubprocessExecutor`, `ContainerExecutor`) are constructed
    /// directly against their own constructors and wrapped with
    /// [`Session::from_parts`] — `open` covers the common in-process path
    /// used by the CLI and tests.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let storage: Arc<dyn Storage> = Arc::from(skill_context::store::open(&config.storage_access)?);
        let namespaces = bootstrap_with_storage(
            storage,
            &config.tools_path,
            &config.deps_config,
            config.embedder.clone(),
            tokio::runtime::Handle::current(),
        )
        .await?;
        let executor = InProcessExecutor::from_namespaces(namespaces.clone())?;
        let session = Self::from_parts(namespaces, Arc::new(executor));
        if config.sync_deps_on_start {
            session.sync_deps().await?;
        }
        Ok(session)
    }

    pub fn from_parts(namespaces: NamespaceDict, executor: Arc<dyn Executor>) -> Self {
        Self {
            namespaces,
            executor,
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn namespaces(&self) -> &NamespaceDict {
        &self.namespaces
    }

    // -- tools --------------------------------------------------------

    pub fn list_tools(&self) -> Result<Vec<ToolSummary>> {
        Ok(self.namespaces().tools.list().iter().map(Tool::summary).collect())
    }

    pub fn search_tools(&self, query: &str, limit: usize) -> Result<Vec<ToolSummary>> {
        Ok(self.namespaces().tools.search(query, limit).iter().map(Tool::summary).collect())
    }

    // -- skills ---------------------------------------------------------

    pub async fn list_skills(&self) -> Result<Vec<skill_context::SkillSummary>> {
        self.namespaces().skills.list().await
    }

    pub async fn search_skills(&self, query: &str, limit: usize) -> Result<Vec<SkillSearchResult>> {
        self.namespaces().skills.search(query, limit).await
    }

    pub async fn get_skill(&self, name: &str) -> Result<SkillRecord> {
        self.namespaces().skills.get(name).await
    }

    pub async fn add_skill(
        &self,
        name: &str,
        source: String,
        description: Option<String>,
        overwrite: bool,
    ) -> Result<skill_context::SkillSummary> {
        self.namespaces().skills.create(name, source, description, overwrite).await
    }

    pub async fn remove_skill(&self, name: &str) -> Result<bool> {
        self.namespaces().skills.delete(name).await
    }

    // -- artifacts --------------------------------------------------------

    pub async fn list_artifacts(&self) -> Result<Vec<ArtifactSummary>> {
        Ok(self.namespaces().storage.list_artifacts().await?)
    }

    pub async fn save_artifact(&self, artifact: &Artifact) -> Result<()> {
        Ok(self.namespaces().storage.put_artifact(artifact).await?)
    }

    pub async fn load_artifact(&self, name: &str) -> Result<Artifact> {
        Ok(self.namespaces().storage.get_artifact(name).await?)
    }

    pub async fn delete_artifact(&self, name: &str) -> Result<bool> {
        Ok(self.namespaces().storage.delete_artifact(name).await?)
    }

    // -- deps --------------------------------------------------------

    pub async fn list_deps(&self) -> Result<Vec<Dep>> {
        Ok(self.namespaces().storage.list_deps().await?)
    }

    pub async fn add_dep(&self, spec: &str) -> Result<AddOutcome> {
        self.namespaces().deps.add(spec).await
    }

    pub async fn remove_dep(&self, spec: &str) -> Result<bool> {
        self.namespaces().deps.remove(spec).await
    }

    pub async fn sync_deps(&self) -> Result<InstallReport> {
        self.namespaces().deps.sync().await
    }

    // -- execution --------------------------------------------------------

    pub async fn run(&self, code: &str, timeout: Option<Duration>) -> Result<ExecutionResult> {
        self.executor.execute(code, timeout).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.executor.reset().await
    }

    pub fn supports(&self, cap: Capability) -> bool {
        self.executor.supports(cap)
    }

    pub fn supported_capabilities(&self) -> std::collections::HashSet<Capability> {
        self.executor.capabilities()
    }

    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, std::sync::atomic::Ordering::SeqCst) {
            return Ok(());
        }
        self.executor.close().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed.swap(true, std::sync::atomic::Ordering::SeqCst) {
            let executor = self.executor.clone();
            tokio::task::spawn(async move {
                let _ = executor.close().await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DepsPolicy;

    async fn config(dir: &std::path::Path) -> SessionConfig {
        let tools_dir = dir.join("tools");
        std::fs::create_dir_all(&tools_dir).unwrap();
        SessionConfig {
            storage_access: StorageAccess::File { base_path: dir.join("store") },
            tools_path: tools_dir,
            deps_config: DepsConfig { policy: DepsPolicy::Allow, ..Default::default() },
            embedder: None,
            sync_deps_on_start: false,
        }
    }

    #[tokio::test]
    async fn open_run_reset_close_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(config(dir.path()).await).await.unwrap();

        let r = session.run("1 + 1", None).await.unwrap();
        assert_eq!(r.value, serde_json::json!(2));

        session.reset().await.unwrap();
        assert!(session.supports(Capability::Reset));

        session.close().await.unwrap();
        assert!(matches!(session.run("1", None).await, Err(crate::errors::RuntimeError::ExecutorClosed)));
    }

    #[tokio::test]
    async fn skill_and_artifact_facade_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(config(dir.path()).await).await.unwrap();

        session
            .add_skill("greet", "-- says hi\nfunction run(params) return 1 end".to_string(), None, false)
            .await
            .unwrap();
        let skills = session.list_skills().await.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "greet");

        let artifact = Artifact {
            name: "note".to_string(),
            data: b"hello".to_vec(),
            description: "a note".to_string(),
            metadata: Default::default(),
            created_at: chrono::Utc::now(),
        };
        session.save_artifact(&artifact).await.unwrap();
        let loaded = session.load_artifact("note").await.unwrap();
        assert_eq!(loaded.data, b"hello".to_vec());
    }
}
