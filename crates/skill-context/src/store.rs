//! File and key-value storage backends (spec §4.A).
//!
//! Both backends implement [`Storage`]; callers (the skill library, the
//! artifact/dep facades in `skill-runtime`, and the bootstrap routine) are
//! written against the trait and never branch on which backend is in use.
//!
//! Grounded in the teacher's `ContextStorage` temp-file-then-rename write
//! path and JSON index file for fast listing, generalized from a single
//! "context" entity to the three stores this spec needs (skills, artifacts,
//! deps), and extended with a Redis-backed sibling for the KV case.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::entities::{Artifact, ArtifactSummary, Dep, Skill, SkillSummary, StorageAccess};
use crate::{ContextError, Result};

/// Uniform operations over the three persisted stores (skills, artifacts,
/// deps). `list` never fails wholesale on a single corrupt entity — it
/// degrades that entity to a summary carrying an `error` field instead
/// (skills only; artifacts/deps have no equivalent partial-parse failure
/// mode since they aren't compiled).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a skill by name, including its source.
    async fn get_skill(&self, name: &str) -> Result<Skill>;
    /// Persist a skill, overwriting any existing entry with the same name.
    async fn put_skill(&self, skill: &Skill) -> Result<()>;
    /// Remove a skill. Idempotent: returns `false` if it did not exist.
    async fn delete_skill(&self, name: &str) -> Result<bool>;
    /// List all skills. Corrupt entries are included with `error` set and
    /// are otherwise omitted from detail.
    async fn list_skills(&self) -> Result<Vec<SkillSummary>>;
    /// Whether a skill with this name exists.
    async fn skill_exists(&self, name: &str) -> Result<bool>;

    /// Fetch an artifact's bytes and metadata by name.
    async fn get_artifact(&self, name: &str) -> Result<Artifact>;
    /// Persist an artifact, overwriting any existing entry with the same name.
    async fn put_artifact(&self, artifact: &Artifact) -> Result<()>;
    /// Remove an artifact. Idempotent: returns `false` if it did not exist.
    async fn delete_artifact(&self, name: &str) -> Result<bool>;
    /// List artifact summaries (no payload bytes).
    async fn list_artifacts(&self) -> Result<Vec<ArtifactSummary>>;
    /// Whether an artifact with this name exists.
    async fn artifact_exists(&self, name: &str) -> Result<bool>;

    /// The full declared dependency list.
    async fn list_deps(&self) -> Result<Vec<Dep>>;
    /// Add or replace a dep, deduplicating by package name (a later `put`
    /// for the same name replaces the prior version constraint).
    async fn put_dep(&self, dep: Dep) -> Result<()>;
    /// Remove a dep by package name. Idempotent: returns `false` if absent.
    async fn delete_dep(&self, name: &str) -> Result<bool>;

    /// A serializable descriptor sufficient for a fresh process to reopen
    /// this exact store.
    fn access(&self) -> StorageAccess;
}

/// File-backed storage: `<base>/skills/<name>.source` + `<name>.meta`,
/// `<base>/artifacts/<name>` + `<name>.meta`, `<base>/requirements.txt`.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open (creating if necessary) a file store rooted at `base_path`.
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(base_path.join("skills"))?;
        std::fs::create_dir_all(base_path.join("artifacts"))?;
        Ok(Self { base_path })
    }

    fn skills_dir(&self) -> PathBuf {
        self.base_path.join("skills")
    }

    fn artifacts_dir(&self) -> PathBuf {
        self.base_path.join("artifacts")
    }

    fn deps_path(&self) -> PathBuf {
        self.base_path.join("requirements.txt")
    }

    /// Write `contents` to `path` via a temp file plus atomic rename so a
    /// crash mid-write never leaves a torn entity on disk.
    async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
        let tmp = path.with_extension(format!(
            "{}.tmp",
            path.extension().and_then(|e| e.to_str()).unwrap_or("")
        ));
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SkillMeta {
    description: String,
    parameters: Vec<crate::entities::SkillParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding_content_hash: Option<String>,
    created_at: chrono::DateTime<Utc>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ArtifactMeta {
    description: String,
    metadata: HashMap<String, serde_json::Value>,
    created_at: chrono::DateTime<Utc>,
}

#[async_trait]
impl Storage for FileStorage {
    async fn get_skill(&self, name: &str) -> Result<Skill> {
        let source_path = self.skills_dir().join(format!("{name}.source"));
        let meta_path = self.skills_dir().join(format!("{name}.meta"));
        let source = tokio::fs::read_to_string(&source_path)
            .await
            .map_err(|_| ContextError::NotFound(name.to_string()))?;
        let meta_bytes = tokio::fs::read(&meta_path)
            .await
            .map_err(|_| ContextError::NotFound(name.to_string()))?;
        let meta: SkillMeta = serde_json::from_slice(&meta_bytes).map_err(|e| ContextError::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Skill {
            name: name.to_string(),
            description: meta.description,
            source,
            parameters: meta.parameters,
            embedding: meta.embedding,
            embedding_content_hash: meta.embedding_content_hash,
            created_at: meta.created_at,
        })
    }

    async fn put_skill(&self, skill: &Skill) -> Result<()> {
        if skill.name.is_empty() {
            return Err(ContextError::Conflict("skill name must be non-empty".into()));
        }
        let source_path = self.skills_dir().join(format!("{}.source", skill.name));
        let meta_path = self.skills_dir().join(format!("{}.meta", skill.name));
        let meta = SkillMeta {
            description: skill.description.clone(),
            parameters: skill.parameters.clone(),
            embedding: skill.embedding.clone(),
            embedding_content_hash: skill.embedding_content_hash.clone(),
            created_at: skill.created_at,
        };
        Self::write_atomic(&source_path, skill.source.as_bytes()).await?;
        Self::write_atomic(&meta_path, &serde_json::to_vec_pretty(&meta)?).await?;
        Ok(())
    }

    async fn delete_skill(&self, name: &str) -> Result<bool> {
        let source_path = self.skills_dir().join(format!("{name}.source"));
        let meta_path = self.skills_dir().join(format!("{name}.meta"));
        let existed = tokio::fs::remove_file(&source_path).await.is_ok();
        let _ = tokio::fs::remove_file(&meta_path).await;
        Ok(existed)
    }

    async fn list_skills(&self) -> Result<Vec<SkillSummary>> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(self.skills_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("source") {
                continue;
            }
            let name = path.file_stem().unwrap().to_string_lossy().to_string();
            match self.get_skill(&name).await {
                Ok(skill) => out.push(SkillSummary::from(&skill)),
                Err(e) => out.push(SkillSummary {
                    name,
                    description: String::new(),
                    parameters: Vec::new(),
                    error: Some(e.to_string()),
                }),
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn skill_exists(&self, name: &str) -> Result<bool> {
        Ok(self.skills_dir().join(format!("{name}.source")).exists())
    }

    async fn get_artifact(&self, name: &str) -> Result<Artifact> {
        let data_path = self.artifacts_dir().join(name);
        let meta_path = self.artifacts_dir().join(format!("{name}.meta"));
        let data = tokio::fs::read(&data_path)
            .await
            .map_err(|_| ContextError::NotFound(name.to_string()))?;
        let meta_bytes = tokio::fs::read(&meta_path)
            .await
            .map_err(|_| ContextError::NotFound(name.to_string()))?;
        let meta: ArtifactMeta = serde_json::from_slice(&meta_bytes).map_err(|e| ContextError::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Artifact {
            name: name.to_string(),
            data,
            description: meta.description,
            metadata: meta.metadata,
            created_at: meta.created_at,
        })
    }

    async fn put_artifact(&self, artifact: &Artifact) -> Result<()> {
        if artifact.name.is_empty() {
            return Err(ContextError::Conflict("artifact name must be non-empty".into()));
        }
        let data_path = self.artifacts_dir().join(&artifact.name);
        let meta_path = self.artifacts_dir().join(format!("{}.meta", artifact.name));
        let meta = ArtifactMeta {
            description: artifact.description.clone(),
            metadata: artifact.metadata.clone(),
            created_at: artifact.created_at,
        };
        Self::write_atomic(&data_path, &artifact.data).await?;
        Self::write_atomic(&meta_path, &serde_json::to_vec_pretty(&meta)?).await?;
        Ok(())
    }

    async fn delete_artifact(&self, name: &str) -> Result<bool> {
        let data_path = self.artifacts_dir().join(name);
        let meta_path = self.artifacts_dir().join(format!("{name}.meta"));
        let existed = tokio::fs::remove_file(&data_path).await.is_ok();
        let _ = tokio::fs::remove_file(&meta_path).await;
        Ok(existed)
    }

    async fn list_artifacts(&self) -> Result<Vec<ArtifactSummary>> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(self.artifacts_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("meta") {
                continue;
            }
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if let Ok(artifact) = self.get_artifact(&name).await {
                out.push(ArtifactSummary::from(&artifact));
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn artifact_exists(&self, name: &str) -> Result<bool> {
        Ok(self.artifacts_dir().join(name).exists())
    }

    async fn list_deps(&self) -> Result<Vec<Dep>> {
        match tokio::fs::read_to_string(self.deps_path()).await {
            Ok(contents) => Ok(contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| Dep { spec: l.to_string() })
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_dep(&self, dep: Dep) -> Result<()> {
        let mut deps = self.list_deps().await?;
        deps.retain(|d| d.name() != dep.name());
        deps.push(dep);
        let contents = deps.iter().map(|d| d.spec.clone()).collect::<Vec<_>>().join("\n");
        Self::write_atomic(&self.deps_path(), contents.as_bytes()).await?;
        Ok(())
    }

    async fn delete_dep(&self, name: &str) -> Result<bool> {
        let mut deps = self.list_deps().await?;
        let before = deps.len();
        deps.retain(|d| d.name() != name);
        let removed = deps.len() != before;
        if removed {
            let contents = deps.iter().map(|d| d.spec.clone()).collect::<Vec<_>>().join("\n");
            Self::write_atomic(&self.deps_path(), contents.as_bytes()).await?;
        }
        Ok(removed)
    }

    fn access(&self) -> StorageAccess {
        StorageAccess::File {
            base_path: self.base_path.clone(),
        }
    }
}

/// Redis-backed storage: keys `<prefix>:skills:<name>` (source),
/// `<prefix>:skills:<name>:meta`, `<prefix>:artifacts:<name>` (a single JSON
/// blob carrying bytes + metadata), `<prefix>:deps` (a list).
pub struct KvStorage {
    client: redis::Client,
    connection_url: String,
    prefix: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ArtifactRecord {
    #[serde(with = "crate::entities::base64_bytes")]
    data: Vec<u8>,
    description: String,
    metadata: HashMap<String, serde_json::Value>,
    created_at: chrono::DateTime<Utc>,
}

impl KvStorage {
    /// Open a connection to `connection_url`, namespacing all keys under `prefix`.
    pub fn open(connection_url: impl Into<String>, prefix: impl Into<String>) -> Result<Self> {
        let connection_url = connection_url.into();
        let client = redis::Client::open(connection_url.as_str())
            .map_err(|e| ContextError::StorageUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            connection_url,
            prefix: prefix.into(),
        })
    }

    async fn conn(&self) -> Result<redis::aio::ConnectionManager> {
        self.client
            .get_connection_manager()
            .await
            .map_err(|e| ContextError::StorageUnavailable(e.to_string()))
    }

    fn skill_key(&self, name: &str) -> String {
        format!("{}:skills:{}", self.prefix, name)
    }

    fn skill_meta_key(&self, name: &str) -> String {
        format!("{}:skills:{}:meta", self.prefix, name)
    }

    fn artifact_key(&self, name: &str) -> String {
        format!("{}:artifacts:{}", self.prefix, name)
    }

    fn deps_key(&self) -> String {
        format!("{}:deps", self.prefix)
    }

    fn skills_index_key(&self) -> String {
        format!("{}:skills:__index__", self.prefix)
    }

    fn artifacts_index_key(&self) -> String {
        format!("{}:artifacts:__index__", self.prefix)
    }
}

#[async_trait]
impl Storage for KvStorage {
    async fn get_skill(&self, name: &str) -> Result<Skill> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let source: Option<String> = conn.get(self.skill_key(name)).await?;
        let source = source.ok_or_else(|| ContextError::NotFound(name.to_string()))?;
        let meta_json: Option<String> = conn.get(self.skill_meta_key(name)).await?;
        let meta_json = meta_json.ok_or_else(|| ContextError::NotFound(name.to_string()))?;
        let meta: SkillMeta = serde_json::from_str(&meta_json).map_err(|e| ContextError::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Skill {
            name: name.to_string(),
            description: meta.description,
            source,
            parameters: meta.parameters,
            embedding: meta.embedding,
            embedding_content_hash: meta.embedding_content_hash,
            created_at: meta.created_at,
        })
    }

    async fn put_skill(&self, skill: &Skill) -> Result<()> {
        if skill.name.is_empty() {
            return Err(ContextError::Conflict("skill name must be non-empty".into()));
        }
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let meta = SkillMeta {
            description: skill.description.clone(),
            parameters: skill.parameters.clone(),
            embedding: skill.embedding.clone(),
            embedding_content_hash: skill.embedding_content_hash.clone(),
            created_at: skill.created_at,
        };
        let _: () = conn.set(self.skill_key(&skill.name), &skill.source).await?;
        let _: () = conn
            .set(self.skill_meta_key(&skill.name), serde_json::to_string(&meta)?)
            .await?;
        let _: () = conn.sadd(self.skills_index_key(), &skill.name).await?;
        Ok(())
    }

    async fn delete_skill(&self, name: &str) -> Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let removed: i64 = conn.del(self.skill_key(name)).await?;
        let _: i64 = conn.del(self.skill_meta_key(name)).await?;
        let _: i64 = conn.srem(self.skills_index_key(), name).await?;
        Ok(removed > 0)
    }

    async fn list_skills(&self) -> Result<Vec<SkillSummary>> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let names: Vec<String> = conn.smembers(self.skills_index_key()).await?;
        let mut out = Vec::new();
        for name in names {
            match self.get_skill(&name).await {
                Ok(skill) => out.push(SkillSummary::from(&skill)),
                Err(e) => out.push(SkillSummary {
                    name,
                    description: String::new(),
                    parameters: Vec::new(),
                    error: Some(e.to_string()),
                }),
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn skill_exists(&self, name: &str) -> Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        Ok(conn.exists(self.skill_key(name)).await?)
    }

    async fn get_artifact(&self, name: &str) -> Result<Artifact> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(self.artifact_key(name)).await?;
        let raw = raw.ok_or_else(|| ContextError::NotFound(name.to_string()))?;
        let record: ArtifactRecord = serde_json::from_str(&raw).map_err(|e| ContextError::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Artifact {
            name: name.to_string(),
            data: record.data,
            description: record.description,
            metadata: record.metadata,
            created_at: record.created_at,
        })
    }

    async fn put_artifact(&self, artifact: &Artifact) -> Result<()> {
        if artifact.name.is_empty() {
            return Err(ContextError::Conflict("artifact name must be non-empty".into()));
        }
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let record = ArtifactRecord {
            data: artifact.data.clone(),
            description: artifact.description.clone(),
            metadata: artifact.metadata.clone(),
            created_at: artifact.created_at,
        };
        let _: () = conn
            .set(self.artifact_key(&artifact.name), serde_json::to_string(&record)?)
            .await?;
        let _: () = conn.sadd(self.artifacts_index_key(), &artifact.name).await?;
        Ok(())
    }

    async fn delete_artifact(&self, name: &str) -> Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let removed: i64 = conn.del(self.artifact_key(name)).await?;
        let _: i64 = conn.srem(self.artifacts_index_key(), name).await?;
        Ok(removed > 0)
    }

    async fn list_artifacts(&self) -> Result<Vec<ArtifactSummary>> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let names: Vec<String> = conn.smembers(self.artifacts_index_key()).await?;
        let mut out = Vec::new();
        for name in names {
            if let Ok(artifact) = self.get_artifact(&name).await {
                out.push(ArtifactSummary::from(&artifact));
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn artifact_exists(&self, name: &str) -> Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        Ok(conn.exists(self.artifact_key(name)).await?)
    }

    async fn list_deps(&self) -> Result<Vec<Dep>> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let specs: Vec<String> = conn.lrange(self.deps_key(), 0, -1).await?;
        Ok(specs.into_iter().map(|spec| Dep { spec }).collect())
    }

    async fn put_dep(&self, dep: Dep) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let mut deps = self.list_deps().await?;
        deps.retain(|d| d.name() != dep.name());
        deps.push(dep);
        let _: () = conn.del(self.deps_key()).await?;
        if !deps.is_empty() {
            let specs: Vec<String> = deps.into_iter().map(|d| d.spec).collect();
            let _: () = conn.rpush(self.deps_key(), specs).await?;
        }
        Ok(())
    }

    async fn delete_dep(&self, name: &str) -> Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let mut deps = self.list_deps().await?;
        let before = deps.len();
        deps.retain(|d| d.name() != name);
        let removed = deps.len() != before;
        if removed {
            let _: () = conn.del(self.deps_key()).await?;
            if !deps.is_empty() {
                let specs: Vec<String> = deps.into_iter().map(|d| d.spec).collect();
                let _: () = conn.rpush(self.deps_key(), specs).await?;
            }
        }
        Ok(removed)
    }

    fn access(&self) -> StorageAccess {
        StorageAccess::Kv {
            connection_url: self.connection_url.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

/// Open the backend described by a [`StorageAccess`] descriptor. The single
/// entry point used by both in-process startup and cross-process bootstrap.
pub fn open(access: &StorageAccess) -> Result<Box<dyn Storage>> {
    match access {
        StorageAccess::File { base_path } => Ok(Box::new(FileStorage::open(base_path.clone())?)),
        StorageAccess::Kv { connection_url, prefix } => {
            Ok(Box::new(KvStorage::open(connection_url.clone(), prefix.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_skill(name: &str) -> Skill {
        Skill {
            name: name.to_string(),
            description: "adds two numbers".to_string(),
            source: "-- @param a: integer\n-- @param b: integer\nreturn function(a, b) return a + b end".to_string(),
            parameters: vec![],
            embedding: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn file_storage_skill_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();
        let skill = sample_skill("add");
        store.put_skill(&skill).await.unwrap();

        let fetched = store.get_skill("add").await.unwrap();
        assert_eq!(fetched.source, skill.source);
        assert_eq!(fetched.description, skill.description);

        let listed = store.list_skills().await.unwrap();
        assert!(listed.iter().any(|s| s.name == "add"));

        assert!(store.delete_skill("add").await.unwrap());
        assert!(!store.delete_skill("add").await.unwrap());
        assert!(store.get_skill("add").await.is_err());
    }

    #[tokio::test]
    async fn file_storage_artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();
        let artifact = Artifact {
            name: "report".to_string(),
            data: b"hello world".to_vec(),
            description: "a report".to_string(),
            metadata: HashMap::from([("kind".to_string(), serde_json::json!("pdf"))]),
            created_at: Utc::now(),
        };
        store.put_artifact(&artifact).await.unwrap();
        let fetched = store.get_artifact("report").await.unwrap();
        assert_eq!(fetched.data, artifact.data);
        assert_eq!(fetched.metadata, artifact.metadata);
    }

    #[tokio::test]
    async fn file_storage_deps_dedup_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();
        store.put_dep(Dep { spec: "pkg-a==1.0".to_string() }).await.unwrap();
        store.put_dep(Dep { spec: "pkg-a==2.0".to_string() }).await.unwrap();
        let deps = store.list_deps().await.unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].spec, "pkg-a==2.0");
    }

    #[tokio::test]
    async fn file_storage_list_skills_degrades_corrupt_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();
        store.put_skill(&sample_skill("good")).await.unwrap();
        tokio::fs::write(dir.path().join("skills/bad.source"), "whatever").await.unwrap();
        tokio::fs::write(dir.path().join("skills/bad.meta"), b"{ not json").await.unwrap();

        let listed = store.list_skills().await.unwrap();
        assert_eq!(listed.len(), 2);
        let bad = listed.iter().find(|s| s.name == "bad").unwrap();
        assert!(bad.error.is_some());
        let good = listed.iter().find(|s| s.name == "good").unwrap();
        assert!(good.error.is_none());
    }

    #[test]
    fn storage_access_round_trips_through_json() {
        let access = StorageAccess::File { base_path: PathBuf::from("/tmp/store") };
        let json = serde_json::to_string(&access).unwrap();
        let back: StorageAccess = serde_json::from_str(&json).unwrap();
        match back {
            StorageAccess::File { base_path } => assert_eq!(base_path, PathBuf::from("/tmp/store")),
            _ => panic!("wrong variant"),
        }
    }
}
