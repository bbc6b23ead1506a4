//! Skill library (spec §4.E): parse, compile, invoke, and semantically
//! search persisted skills.
//!
//! Grounded in the teacher's `skill_md` frontmatter parser — a leading
//! structured block recovers metadata the source can't expose reflectively.
//! `SKILL.md` uses YAML frontmatter for that; a Lua chunk has no signature
//! introspection at all, so the parameter list is declared in a leading
//! `-- @param name: type = default` comment block instead, parsed the same
//! way (strip the block, fall back to a trailing comment line for the
//! description). Semantic search reuses the teacher's `embeddings` /
//! `vector_store` stack (`EmbeddingProvider`, `cosine_similarity`) with a
//! persisted content-hash cache on the `Skill` entity itself.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use mlua::Lua;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::embeddings::EmbeddingProvider;
use crate::errors::{Result, RuntimeError};
use crate::namespace::NamespaceDict;
use crate::vector_store::cosine_similarity;
use skill_context::{Skill, SkillParameter, SkillSummary, Storage};

fn skill_name_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

fn param_line_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"^@param\s+([A-Za-z_][A-Za-z0-9_]*)\s*:\s*(\w+)\s*(?:=\s*(.+))?$").unwrap()
    })
}

/// The full agent-facing record for `skills.get(name)` — everything but the
/// embedding cache, which is an implementation detail of `search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecord {
    pub name: String,
    pub description: String,
    pub source: String,
    pub parameters: Vec<SkillParameter>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Skill> for SkillRecord {
    fn from(skill: Skill) -> Self {
        Self {
            name: skill.name,
            description: skill.description,
            source: skill.source,
            parameters: skill.parameters,
            created_at: skill.created_at,
        }
    }
}

/// A `skills.search` hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSearchResult {
    #[serde(flatten)]
    pub summary: SkillSummary,
    pub score: f32,
}

/// The parsed header of a skill's source: a leading run of `--` comment
/// lines, `@param` entries extracted and the remainder folded into the
/// description.
struct ParsedHeader {
    description: String,
    parameters: Vec<SkillParameter>,
}

fn parse_header(source: &str, explicit_description: Option<&str>) -> ParsedHeader {
    let mut parameters = Vec::new();
    let mut desc_lines = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim_start();
        let Some(comment) = trimmed.strip_prefix("--") else {
            break;
        };
        let comment = comment.trim();
        if let Some(caps) = param_line_re().captures(comment) {
            let name = caps[1].to_string();
            let type_hint = Some(caps[2].to_string());
            let default = caps.get(3).map(|m| parse_default_literal(m.as_str().trim()));
            parameters.push(SkillParameter { name, type_hint, default });
        } else if !comment.is_empty() {
            desc_lines.push(comment.to_string());
        }
    }

    let description = explicit_description
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| desc_lines.join(" "));

    ParsedHeader { description, parameters }
}

/// Best-effort literal parse for an `@param`'s default value — used only to
/// populate the declared parameter list (`skills.get`/`skills.list`); the
/// canonical default applied at call time is the same string re-parsed by
/// `bind_args` below.
fn parse_default_literal(text: &str) -> Value {
    if let Ok(n) = text.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = text.parse::<f64>() {
        return Value::from(f);
    }
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "nil" => return Value::Null,
        _ => {}
    }
    let unquoted = text.trim_matches('"').trim_matches('\'');
    Value::String(unquoted.to_string())
}

fn content_hash(source: &str, description: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    source.hash(&mut hasher);
    description.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Parses, compiles, invokes, and indexes persisted skills.
///
/// Each call gets its own throwaway [`Lua`] instance — distinct from an
/// executor's own interpreter — rather than one shared across calls. A
/// skill body may invoke another skill (spec §4.E), which re-enters
/// [`SkillLibrary::invoke`] from inside a Lua metamethod via
/// [`NamespaceDict::block_on`]; a single interpreter guarded by one lock
/// held across that call's execution would deadlock the moment a skill
/// composed with itself or another skill, since the nested call can never
/// re-acquire a lock its own caller is still holding. A fresh `Lua` per
/// call has nothing to contend on.
pub struct SkillLibrary {
    storage: Arc<dyn Storage>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl SkillLibrary {
    pub fn new(storage: Arc<dyn Storage>, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self { storage, embedder }
    }

    pub async fn list(&self) -> Result<Vec<SkillSummary>> {
        Ok(self.storage.list_skills().await?)
    }

    pub async fn get(&self, name: &str) -> Result<SkillRecord> {
        Ok(self.storage.get_skill(name).await?.into())
    }

    pub async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.storage.delete_skill(name).await?)
    }

    /// `skills.create(name, source, description)`. Always validated and
    /// compile-checked before being persisted; `overwrite` governs whether
    /// replacing an existing skill of the same name is a [`RuntimeError::DuplicateSkill`].
    pub async fn create(
        &self,
        name: &str,
        source: String,
        description: Option<String>,
        overwrite: bool,
    ) -> Result<SkillSummary> {
        if !skill_name_re().is_match(name) {
            return Err(RuntimeError::InvalidRequest(format!(
                "'{name}' is not a valid skill name (expected [A-Za-z_][A-Za-z0-9_]*)"
            )));
        }
        if !overwrite && self.storage.skill_exists(name).await? {
            return Err(RuntimeError::DuplicateSkill(name.to_string()));
        }

        let header = parse_header(&source, description.as_deref());
        self.compile_check(&source).await?;

        let skill = Skill {
            name: name.to_string(),
            description: header.description,
            source,
            parameters: header.parameters,
            embedding: None,
            embedding_content_hash: None,
            created_at: chrono::Utc::now(),
        };
        self.storage.put_skill(&skill).await?;
        Ok(SkillSummary::from(&skill))
    }

    /// Compiles `source` in a throwaway environment and confirms it defines
    /// a callable top-level `run`, without invoking it.
    async fn compile_check(&self, source: &str) -> Result<()> {
        let lua = Lua::new();
        let env = Self::fresh_env(&lua)?;
        lua.load(source)
            .set_name("skill")
            .set_environment(env.clone())
            .exec_async()
            .await
            .map_err(|e| RuntimeError::SyntaxError(e.to_string()))?;
        env.get::<mlua::Function>("run")
            .map_err(|_| RuntimeError::SyntaxError("skill source does not define a top-level `run` function".into()))?;
        Ok(())
    }

    fn fresh_env(lua: &Lua) -> Result<mlua::Table> {
        let env = lua.create_table()?;
        let meta = lua.create_table()?;
        meta.set("__index", lua.globals())?;
        env.set_metatable(Some(meta));
        Ok(env)
    }

    /// `skills.X(**kwargs)` / `skills.invoke("X", **kwargs)`: binds `args`
    /// against the declared parameter list (missing required →
    /// `MissingArgument`, unexpected key → `UnknownArgument`), compiles a
    /// fresh interpreter and environment for this call (so recursive
    /// invocation never shares call-local state, and never blocks on another
    /// in-flight call's interpreter — spec §4.E), and calls `run(params)`.
    pub async fn invoke(&self, name: &str, args: HashMap<String, Value>, ns: &NamespaceDict) -> Result<Value> {
        let skill = self.storage.get_skill(name).await?;
        let params = bind_args(&skill.parameters, args)?;

        let lua = Lua::new();
        ns.install(&lua)?;
        let env = Self::fresh_env(&lua)?;
        lua.load(&skill.source)
            .set_name(skill.name.as_str())
            .set_environment(env.clone())
            .exec_async()
            .await
            .map_err(|e| RuntimeError::SyntaxError(e.to_string()))?;
        let run: mlua::Function = env
            .get("run")
            .map_err(|_| RuntimeError::SkillError(format!("skill '{name}' does not define `run`")))?;

        let params_table = lua.to_value(&params).map_err(RuntimeError::Lua)?;
        let result: mlua::Value = run
            .call_async(params_table)
            .await
            .map_err(|e| RuntimeError::SkillError(e.to_string()))?;
        lua.from_value(result).map_err(RuntimeError::Lua)
    }

    /// `skills.search(query, limit)`: cosine similarity over cached
    /// description+source embeddings when an [`EmbeddingProvider`] is
    /// configured, degrading to a case-insensitive substring match
    /// otherwise. Stale cache entries (source or description changed since
    /// the embedding was computed) are recomputed and persisted back.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SkillSearchResult>> {
        let summaries = self.storage.list_skills().await?;
        let mut scored = Vec::new();

        if let Some(embedder) = &self.embedder {
            let query_embedding = embedder
                .embed_query(query)
                .await
                .map_err(|e| RuntimeError::SkillError(format!("embedding query failed: {e}")))?;
            for summary in summaries {
                if summary.error.is_some() {
                    continue;
                }
                let mut skill = match self.storage.get_skill(&summary.name).await {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let hash = content_hash(&skill.source, &skill.description);
                let embedding = if skill.embedding_content_hash.as_deref() == Some(hash.as_str()) {
                    skill.embedding.clone().unwrap_or_default()
                } else {
                    let text = format!("{}\n{}", skill.description, skill.source);
                    let fresh = embedder
                        .embed_query(&text)
                        .await
                        .map_err(|e| RuntimeError::SkillError(format!("embedding skill '{}' failed: {e}", skill.name)))?;
                    skill.embedding = Some(fresh.clone());
                    skill.embedding_content_hash = Some(hash);
                    let _ = self.storage.put_skill(&skill).await;
                    fresh
                };
                if embedding.is_empty() {
                    continue;
                }
                let score = cosine_similarity(&query_embedding, &embedding);
                if score > 0.0 {
                    scored.push(SkillSearchResult {
                        summary: SkillSummary::from(&skill),
                        score,
                    });
                }
            }
        } else {
            let needle = query.to_lowercase();
            for summary in summaries {
                if summary.error.is_some() {
                    continue;
                }
                let haystack = format!("{} {}", summary.name, summary.description).to_lowercase();
                if haystack.contains(&needle) {
                    scored.push(SkillSearchResult { summary, score: 1.0 });
                }
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }
}

/// Binds `args` against `parameters`, applying declared defaults and
/// rejecting both missing required parameters and unrecognized keys.
fn bind_args(parameters: &[SkillParameter], mut args: HashMap<String, Value>) -> Result<Value> {
    let mut bound = serde_json::Map::new();
    for param in parameters {
        match args.remove(&param.name) {
            Some(v) => {
                bound.insert(param.name.clone(), v);
            }
            None => match &param.default {
                Some(default) => {
                    bound.insert(param.name.clone(), default.clone());
                }
                None => return Err(RuntimeError::MissingArgument(param.name.clone())),
            },
        }
    }
    if let Some((key, _)) = args.into_iter().next() {
        return Err(RuntimeError::UnknownArgument(key));
    }
    Ok(Value::Object(bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skill_context::FileStorage;

    fn library(dir: &std::path::Path) -> SkillLibrary {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir).unwrap());
        SkillLibrary::new(storage, None)
    }

    fn dummy_ns(storage: Arc<dyn Storage>, skills: Arc<SkillLibrary>) -> NamespaceDict {
        NamespaceDict {
            tools: Arc::new(crate::tool_registry::ToolRegistry::new()),
            skills,
            storage,
            deps: Arc::new(crate::deps::DepsController::new(
                Arc::new(FileStorage::open(std::env::temp_dir().join(format!("deps-{:?}", std::thread::current().id()))).unwrap()),
                Arc::new(crate::deps::ShellInstaller::default()),
                crate::deps::DepsPolicy::Allow,
            )),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    #[test]
    fn parses_param_header_and_description() {
        let source = "-- repo star count\n-- @param owner: string\n-- @param repo: string = \"skill\"\nfunction run(params)\n  return 1\nend\n";
        let header = parse_header(source, None);
        assert_eq!(header.description, "repo star count");
        assert_eq!(header.parameters.len(), 2);
        assert_eq!(header.parameters[0].name, "owner");
        assert_eq!(header.parameters[0].default, None);
        assert_eq!(header.parameters[1].default, Some(Value::String("skill".to_string())));
    }

    #[test]
    fn bind_args_rejects_missing_and_unknown() {
        let params = vec![SkillParameter {
            name: "owner".to_string(),
            type_hint: Some("string".to_string()),
            default: None,
        }];
        assert!(matches!(
            bind_args(&params, HashMap::new()),
            Err(RuntimeError::MissingArgument(ref n)) if n == "owner"
        ));
        let mut args = HashMap::new();
        args.insert("owner".to_string(), Value::String("a".to_string()));
        args.insert("extra".to_string(), Value::Bool(true));
        assert!(matches!(
            bind_args(&params, args),
            Err(RuntimeError::UnknownArgument(ref n)) if n == "extra"
        ));
    }

    #[tokio::test]
    async fn create_rejects_bad_name_and_persists_valid_one() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library(dir.path());
        let err = lib.create("1bad", "function run(params) return 1 end".to_string(), None, false).await.unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidRequest(_)));

        let summary = lib
            .create("greet", "function run(params) return 1 end".to_string(), Some("says hi".to_string()), false)
            .await
            .unwrap();
        assert_eq!(summary.name, "greet");
        assert_eq!(summary.description, "says hi");
    }

    #[tokio::test]
    async fn create_rejects_source_without_run() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library(dir.path());
        let err = lib.create("broken", "local x = 1".to_string(), None, false).await.unwrap_err();
        assert!(matches!(err, RuntimeError::SyntaxError(_)));
    }

    #[tokio::test]
    async fn invoke_binds_defaults_and_returns_value() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path()).unwrap());
        let lib = Arc::new(SkillLibrary::new(storage.clone(), None));
        lib.create(
            "add_one",
            "-- @param n: integer = 1\nfunction run(params)\n  return params.n + 1\nend\n".to_string(),
            None,
            false,
        )
        .await
        .unwrap();

        let ns = dummy_ns(storage, lib.clone());
        let result = lib.invoke("add_one", HashMap::new(), &ns).await.unwrap();
        assert_eq!(result, Value::from(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn s3_skill_composition_recursive_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path()).unwrap());
        let lib = Arc::new(SkillLibrary::new(storage.clone(), None));
        lib.create(
            "inner",
            "-- @param x: integer\nfunction run(params)\n  return params.x * 2\nend\n".to_string(),
            None,
            false,
        )
        .await
        .unwrap();
        lib.create(
            "outer",
            "-- @param x: integer\nfunction run(params)\n  return skills.inner{x = params.x} + 1\nend\n".to_string(),
            None,
            false,
        )
        .await
        .unwrap();

        let ns = dummy_ns(storage, lib.clone());
        let mut args = HashMap::new();
        args.insert("x".to_string(), Value::from(3));
        let result = lib.invoke("outer", args, &ns).await.unwrap();
        assert_eq!(result, Value::from(7));
    }
}
