//! Persisted entity shapes owned by the storage layer: [`Skill`], [`Artifact`],
//! [`Dep`], and the [`StorageAccess`] descriptor that lets a fresh process
//! reopen the same stores.
//!
//! These types live below `skill-runtime` in the dependency graph because the
//! storage backends in [`crate::store`] are the single place that reads and
//! writes them to disk or to a key-value store; `skill-runtime` re-exports
//! them unchanged for agent-facing code.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A parameter recovered from a skill's `run` signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// A named, persisted code recipe with a `run` entry point.
///
/// Invariant: `name` matches `[A-Za-z_][A-Za-z0-9_]*` and `source` compiles
/// with a callable top-level `run`. Compilation is the skill library's job
/// (`skill-runtime::skills`); the storage layer treats `source` as an opaque
/// string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub source: String,
    pub parameters: Vec<SkillParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Hash of `source + description` at the time `embedding` was computed,
    /// used to invalidate the cache when either changes (spec §4.E).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_content_hash: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Summary view of a skill — everything but the source, used by `skills.list()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
    pub parameters: Vec<SkillParameter>,
    /// Set when the stored source failed to parse; the skill is still
    /// listed by name but excluded from the callable set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Skill> for SkillSummary {
    fn from(skill: &Skill) -> Self {
        Self {
            name: skill.name.clone(),
            description: skill.description.clone(),
            parameters: skill.parameters.clone(),
            error: None,
        }
    }
}

/// A named persisted blob with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub description: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Summary view of an artifact — no payload bytes, used by `artifacts.list()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub name: String,
    pub description: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub size_bytes: usize,
}

impl From<&Artifact> for ArtifactSummary {
    fn from(artifact: &Artifact) -> Self {
        Self {
            name: artifact.name.clone(),
            description: artifact.description.clone(),
            metadata: artifact.metadata.clone(),
            created_at: artifact.created_at,
            size_bytes: artifact.data.len(),
        }
    }
}

pub(crate) mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// A declared package requirement (`name` or `name>=version`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dep {
    pub spec: String,
}

impl Dep {
    /// The package name portion of `spec`, ignoring any version constraint.
    pub fn name(&self) -> &str {
        self.spec
            .split(|c: char| "=<>!~".contains(c))
            .next()
            .unwrap_or(&self.spec)
            .trim()
    }
}

/// Serializable descriptor a fresh process uses to reopen the same stores.
///
/// Produced by a backend's `to_bootstrap_config()` and consumed by
/// `skill-runtime::bootstrap::bootstrap_namespaces` on the other side of a
/// process or container boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageAccess {
    File { base_path: std::path::PathBuf },
    Kv { connection_url: String, prefix: String },
}
