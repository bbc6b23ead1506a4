//! Cross-process bootstrap (spec §4.H).
//!
//! The single point of namespace construction: given a [`StorageAccess`]
//! descriptor, a tools directory, and a [`DepsConfig`], build the four
//! agent-visible globals (`tools`, `skills`, `artifacts`, `deps`) as a
//! [`NamespaceDict`]. Called identically by the in-process executor and by
//! the subprocess/container kernel after it deserializes the bootstrap
//! message sent over stdio or through the container's environment — the
//! guarantee (spec §4.H, invariant I9) is that both paths see the same set
//! of tools/skills/artifacts for the same inputs, because both paths run
//! this exact function.
//!
//! Grounded in `skill_context::store::open` (already the single
//! descriptor-to-`Box<dyn Storage>` entry point) plus the teacher's
//! WIT-bootstrap idea in the wasmtime-component binding generator: a fixed
//! exported surface that the host reconstructs identically on both sides of
//! a process boundary — here the "surface" is the namespace dict's four
//! globals instead of WIT exports.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::deps::DepsConfig;
use crate::deps::DepsController;
use crate::embeddings::EmbeddingProvider;
use crate::errors::Result;
use crate::namespace::NamespaceDict;
use crate::skills::SkillLibrary;
use crate::tool_registry::ToolRegistry;
use skill_context::{Storage, StorageAccess};

/// Everything a fresh process needs to reconstruct an identical namespace:
/// the storage descriptor, where to load tool definitions from, and how the
/// deps controller should be configured. This is exactly the payload the
/// subprocess kernel receives as its bootstrap message (§4.G.2 step 3) and
/// the container executor passes through the container's environment
/// (§4.G.3 step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub storage_access: StorageAccess,
    pub tools_path: std::path::PathBuf,
    pub deps_config: DepsConfig,
}

/// Build a [`NamespaceDict`] from a [`BootstrapConfig`]. `embedder` is
/// supplied by the caller rather than serialized, since an
/// [`EmbeddingProvider`] is a live trait object (spec §4.E, §9: "treat as an
/// injected interface"), not bootstrap-serializable state; a remote kernel
/// is free to construct its own (or run with ranking degraded to substring
/// match, per spec, by passing `None`).
pub async fn bootstrap_namespaces(
    config: &BootstrapConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    runtime: tokio::runtime::Handle,
) -> Result<NamespaceDict> {
    let storage: Arc<dyn Storage> = Arc::from(skill_context::store::open(&config.storage_access)?);
    bootstrap_with_storage(storage, &config.tools_path, &config.deps_config, embedder, runtime).await
}

/// As [`bootstrap_namespaces`], but takes an already-open [`Storage`]
/// instead of reopening one from a descriptor. Used by the in-process
/// executor, which already owns the storage handle the session was
/// constructed with and has no reason to reopen it from its own descriptor.
pub async fn bootstrap_with_storage(
    storage: Arc<dyn Storage>,
    tools_path: &Path,
    deps_config: &DepsConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    runtime: tokio::runtime::Handle,
) -> Result<NamespaceDict> {
    let tools = Arc::new(ToolRegistry::load_dir(tools_path).await?);
    let skills = Arc::new(SkillLibrary::new(storage.clone(), embedder));
    let installer = Arc::new(deps_config.installer());
    let deps = Arc::new(DepsController::new(storage.clone(), installer, deps_config.policy));
    Ok(NamespaceDict {
        tools,
        skills,
        storage,
        deps,
        runtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DepsPolicy;

    /// I9: bootstrapping twice from the same descriptor produces namespaces
    /// whose `tools.list()`/`skills.list()`/`artifacts.list()` agree.
    #[tokio::test]
    async fn i9_bootstrap_is_reproducible_from_same_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let tools_dir = dir.path().join("tools");
        std::fs::create_dir_all(&tools_dir).unwrap();
        std::fs::write(
            tools_dir.join("curl.yaml"),
            "name: curl\ncommand: curl\nschema: {}\n",
        )
        .unwrap();

        let storage: Arc<dyn Storage> = Arc::new(skill_context::FileStorage::open(dir.path().join("store")).unwrap());
        storage
            .put_skill(&skill_context::Skill {
                name: "greet".to_string(),
                description: "says hi".to_string(),
                source: "function run(params) return 1 end".to_string(),
                parameters: vec![],
                embedding: None,
                embedding_content_hash: None,
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let access = storage.access();
        let deps_config = DepsConfig { policy: DepsPolicy::Allow, ..Default::default() };
        let config = BootstrapConfig {
            storage_access: access,
            tools_path: tools_dir,
            deps_config,
        };

        let ns_a = bootstrap_namespaces(&config, None, tokio::runtime::Handle::current()).await.unwrap();
        let ns_b = bootstrap_namespaces(&config, None, tokio::runtime::Handle::current()).await.unwrap();

        let tools_a: Vec<_> = ns_a.tools.list().iter().map(|t| t.name.clone()).collect();
        let tools_b: Vec<_> = ns_b.tools.list().iter().map(|t| t.name.clone()).collect();
        assert_eq!(tools_a, tools_b);
        assert_eq!(tools_a, vec!["curl".to_string()]);

        let skills_a = ns_a.skills.list().await.unwrap();
        let skills_b = ns_b.skills.list().await.unwrap();
        assert_eq!(skills_a.len(), 1);
        assert_eq!(skills_a.len(), skills_b.len());
        assert_eq!(skills_a[0].name, "greet");
    }
}
