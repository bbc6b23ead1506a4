//! Session configuration loading (spec §4.J's `SessionConfig`, generalized
//! to a TOML file the CLI reads before opening a session). Grounded in the
//! teacher's `InstanceConfig`/`SkillManifest` TOML-plus-env-expansion
//! loading idiom; `expand_env_vars` is carried forward verbatim from the
//! teacher's `manifest::expand_env_vars`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use skill_context::StorageAccess;
use skill_runtime::{
    DepsConfig, DepsPolicy, EmbeddingConfig, EmbeddingProvider, EmbeddingProviderFactory, EmbeddingProviderType,
    SessionConfig,
};
use std::sync::Arc;

/// On-disk shape of `skill.toml`. Every field has a sensible default so an
/// empty or absent file still produces a working local session rooted at
/// the current directory.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default = "default_tools_path")]
    pub tools_path: PathBuf,
    #[serde(default)]
    pub deps: DepsSection,
    #[serde(default)]
    pub embeddings: Option<EmbeddingsSection>,
    #[serde(default)]
    pub sync_deps_on_start: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageSection {
    File {
        #[serde(default = "default_base_path")]
        base_path: PathBuf,
    },
    Kv {
        connection_url: String,
        #[serde(default = "default_prefix")]
        prefix: String,
    },
}

impl Default for StorageSection {
    fn default() -> Self {
        StorageSection::File {
            base_path: default_base_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DepsSection {
    #[serde(default)]
    pub policy: DepsPolicySection,
    #[serde(default)]
    pub installer_command: Option<String>,
    #[serde(default)]
    pub installer_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DepsPolicySection {
    #[default]
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsSection {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".skill-data")
}

fn default_tools_path() -> PathBuf {
    PathBuf::from("tools")
}

fn default_prefix() -> String {
    "skill".to_string()
}

/// Load `path` (or a fresh default config if it doesn't exist), expand
/// `${VAR}`/`${VAR:-default}` references, and turn it into a
/// [`SessionConfig`] ready for `Session::open`.
pub async fn load(path: &Path) -> Result<SessionConfig> {
    let file_config: FileConfig = if path.exists() {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let expanded = expand_env_vars(&raw)?;
        toml::from_str(&expanded).with_context(|| format!("parsing {}", path.display()))?
    } else {
        FileConfig::default()
    };

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let storage_access = match file_config.storage {
        StorageSection::File { base_path } => StorageAccess::File {
            base_path: resolve(base_dir, &base_path),
        },
        StorageSection::Kv { connection_url, prefix } => StorageAccess::Kv { connection_url, prefix },
    };

    let default_deps = DepsConfig::default();
    let deps_config = DepsConfig {
        policy: match file_config.deps.policy {
            DepsPolicySection::Allow => DepsPolicy::Allow,
            DepsPolicySection::Disallow => DepsPolicy::Disallow,
        },
        installer_command: file_config.deps.installer_command.unwrap_or(default_deps.installer_command),
        installer_args: file_config.deps.installer_args.unwrap_or(default_deps.installer_args),
    };

    let embedder: Option<Arc<dyn EmbeddingProvider>> = match file_config.embeddings {
        Some(section) => {
            let provider = match section.provider.to_lowercase().as_str() {
                "" | "fastembed" => EmbeddingProviderType::FastEmbed,
                "openai" => EmbeddingProviderType::OpenAI,
                "ollama" => EmbeddingProviderType::Ollama,
                other => anyhow::bail!("unknown embedding provider '{other}'"),
            };
            let config = EmbeddingConfig {
                provider,
                model: section.model,
                ..Default::default()
            };
            Some(EmbeddingProviderFactory::create(&config)?)
        }
        None => None,
    };

    Ok(SessionConfig {
        storage_access,
        tools_path: resolve(base_dir, &file_config.tools_path),
        deps_config,
        embedder,
        sync_deps_on_start: file_config.sync_deps_on_start,
    })
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// `${VAR}`, `${VAR:-default}`, and `${VAR:?message}` expansion, carried
/// forward verbatim from the teacher's `manifest::expand_env_vars`.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            let mut depth = 1;
            for c in chars.by_ref() {
                if c == '{' {
                    depth += 1;
                    var_expr.push(c);
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    var_expr.push(c);
                } else {
                    var_expr.push(c);
                }
            }

            let value = if let Some(pos) = var_expr.find(":-") {
                let var_name = &var_expr[..pos];
                let default_value = &var_expr[pos + 2..];
                std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
            } else if let Some(pos) = var_expr.find(":?") {
                let var_name = &var_expr[..pos];
                let error_msg = &var_expr[pos + 2..];
                std::env::var(var_name)
                    .with_context(|| format!("environment variable {var_name} not set: {error_msg}"))?
            } else {
                std::env::var(&var_expr).with_context(|| format!("environment variable {var_expr} not set"))?
            };
            result.push_str(&value);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_default_and_plain_vars() {
        std::env::set_var("SKILL_CLI_TEST_VAR", "value");
        assert_eq!(expand_env_vars("${SKILL_CLI_TEST_VAR}").unwrap(), "value");
        assert_eq!(expand_env_vars("${MISSING_VAR:-fallback}").unwrap(), "fallback");
    }

    #[tokio::test]
    async fn missing_config_file_produces_local_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("skill.toml")).await.unwrap();
        assert!(matches!(config.storage_access, StorageAccess::File { .. }));
        assert!(!config.sync_deps_on_start);
    }
}
