//! CLI tool definitions and the recipe/escape-hatch command builder.
//!
//! The argv construction algorithm (declaration-order iteration over schema
//! options, `--name`/`-short` emission, one flag instance per array element)
//! is the same shape as `DockerRuntime::build_command` in the teacher's
//! Docker runtime, generalized from a fixed `docker run` flag set to an
//! arbitrary schema loaded from YAML.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, RuntimeError};

/// One schema option (`--name` flag).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptionSchema {
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub short: Option<char>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Boolean,
    String,
    Integer,
    Array,
}

/// One positional argument.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionalSchema {
    pub name: String,
    #[serde(rename = "type", default = "default_positional_type")]
    pub positional_type: OptionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_positional_type() -> OptionType {
    OptionType::String
}

/// `schema.options` + `schema.positional` as declared in the tool YAML.
/// `options` preserves declaration order — it drives argv emission order.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Schema {
    #[serde(default)]
    pub options: indexmap::IndexMap<String, OptionSchema>,
    #[serde(default)]
    pub positional: Vec<PositionalSchema>,
}

impl Schema {
    /// Validate at load time: reject duplicate short aliases within one schema.
    pub fn validate(&self) -> Result<()> {
        let mut seen_shorts = std::collections::HashSet::new();
        for (name, opt) in &self.options {
            if let Some(short) = opt.short {
                if !seen_shorts.insert(short) {
                    return Err(RuntimeError::SchemaError(format!(
                        "duplicate short alias '{short}' on option '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }

    fn known_keys(&self) -> std::collections::HashSet<&str> {
        self.options
            .keys()
            .map(String::as_str)
            .chain(self.positional.iter().map(|p| p.name.as_str()))
            .collect()
    }
}

/// A named, preset-augmented invocation of a tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recipe {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub preset: HashMap<String, Value>,
    #[serde(default)]
    pub params: HashMap<String, RecipeParam>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecipeParam {
    #[serde(default)]
    pub default: Option<Value>,
}

/// A CLI tool definition, as loaded from a tool YAML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub recipes: HashMap<String, Recipe>,
}

fn default_timeout() -> u64 {
    30
}

impl CliToolDefinition {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let def: CliToolDefinition = serde_yaml::from_str(content)
            .map_err(|e| RuntimeError::SchemaError(format!("invalid tool YAML: {e}")))?;
        def.schema.validate()?;
        for (recipe_name, recipe) in &def.recipes {
            let known = def.schema.known_keys();
            for key in recipe.preset.keys().chain(recipe.params.keys()) {
                if !known.contains(key.as_str()) {
                    return Err(RuntimeError::SchemaError(format!(
                        "recipe '{recipe_name}' references unknown key '{key}'"
                    )));
                }
            }
        }
        Ok(def)
    }

    /// Build argv for a named recipe invocation (step 1-4 of the spec's
    /// command builder): merge preset + user args, validate, emit argv.
    pub fn build_recipe_argv(&self, recipe_name: &str, args: &HashMap<String, Value>) -> Result<Vec<String>> {
        let recipe = self
            .recipes
            .get(recipe_name)
            .ok_or_else(|| RuntimeError::NotFound(format!("recipe '{recipe_name}' on tool '{}'", self.name)))?;

        // Unknown-key check: only recipe params are user-settable.
        for key in args.keys() {
            if !recipe.params.contains_key(key) {
                return Err(RuntimeError::UnknownArgument(key.clone()));
            }
        }

        let mut merged = recipe.preset.clone();
        for (param_name, param) in &recipe.params {
            let value = args
                .get(param_name)
                .cloned()
                .or_else(|| param.default.clone());
            if let Some(value) = value {
                merged.insert(param_name.clone(), value);
            }
        }

        self.build_argv(&merged)
    }

    /// Build argv for the escape-hatch form: every schema key individually
    /// available as a keyword, no preset.
    pub fn build_escape_hatch_argv(&self, args: &HashMap<String, Value>) -> Result<Vec<String>> {
        let known = self.schema.known_keys();
        for key in args.keys() {
            if !known.contains(key.as_str()) {
                return Err(RuntimeError::UnknownArgument(key.clone()));
            }
        }
        self.build_argv(args)
    }

    fn build_argv(&self, values: &HashMap<String, Value>) -> Result<Vec<String>> {
        let mut argv = vec![self.command.clone()];

        // Required-option / type validation up front.
        for (name, opt) in &self.schema.options {
            if let Some(value) = values.get(name) {
                check_type(name, opt.option_type, value)?;
            }
        }
        for positional in &self.schema.positional {
            if positional.required && !values.contains_key(&positional.name) {
                return Err(RuntimeError::MissingArgument(positional.name.clone()));
            }
            if let Some(value) = values.get(&positional.name) {
                check_type(&positional.name, positional.positional_type, value)?;
            }
        }

        // Options, in schema declaration order.
        for (name, opt) in &self.schema.options {
            let Some(value) = values.get(name) else { continue };
            let flag = flag_for(name, opt.short);
            match opt.option_type {
                OptionType::Boolean => {
                    if value.as_bool().unwrap_or(false) {
                        argv.push(flag);
                    }
                }
                OptionType::String | OptionType::Integer => {
                    argv.push(flag);
                    argv.push(scalar_to_string(value));
                }
                OptionType::Array => {
                    if let Some(items) = value.as_array() {
                        for item in items {
                            argv.push(flag.clone());
                            argv.push(scalar_to_string(item));
                        }
                    }
                }
            }
        }

        // Positionals, in declared order.
        for positional in &self.schema.positional {
            if let Some(value) = values.get(&positional.name) {
                argv.push(scalar_to_string(value));
            }
        }

        Ok(argv)
    }
}

fn flag_for(name: &str, short: Option<char>) -> String {
    match short {
        Some(c) if name.chars().count() > 1 => format!("-{c}"),
        _ => format!("--{name}"),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn check_type(name: &str, expected: OptionType, value: &Value) -> Result<()> {
    let ok = match expected {
        OptionType::Boolean => value.is_boolean(),
        OptionType::String => value.is_string(),
        OptionType::Integer => value.is_i64() || value.is_u64(),
        OptionType::Array => value.is_array(),
    };
    if ok {
        Ok(())
    } else {
        Err(RuntimeError::ArgumentTypeError(format!(
            "'{name}' expected {expected:?}, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn curl_tool() -> CliToolDefinition {
        let yaml = r#"
name: curl
command: curl
schema:
  options:
    silent:
      type: boolean
      short: s
    location:
      type: boolean
      short: L
    header:
      type: array
      short: H
  positional:
    - name: url
      type: string
      required: true
recipes:
  get:
    preset: { silent: true, location: true }
    params: { url: {} }
"#;
        CliToolDefinition::from_yaml(yaml).unwrap()
    }

    #[test]
    fn s1_recipe_argv() {
        let tool = curl_tool();
        let mut args = HashMap::new();
        args.insert("url".to_string(), json!("https://example.com"));
        let argv = tool.build_recipe_argv("get", &args).unwrap();
        assert_eq!(argv, vec!["curl", "-s", "-L", "https://example.com"]);
    }

    #[test]
    fn s2_escape_hatch_argv() {
        let tool = curl_tool();
        let mut args = HashMap::new();
        args.insert("url".to_string(), json!("https://e.com"));
        args.insert("silent".to_string(), json!(true));
        args.insert("header".to_string(), json!(["A: 1", "B: 2"]));
        let argv = tool.build_escape_hatch_argv(&args).unwrap();
        assert_eq!(argv, vec!["curl", "-s", "-H", "A: 1", "-H", "B: 2", "https://e.com"]);
    }

    #[test]
    fn rejects_unknown_argument() {
        let tool = curl_tool();
        let mut args = HashMap::new();
        args.insert("bogus".to_string(), json!(true));
        let err = tool.build_recipe_argv("get", &args).unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownArgument(_)));
    }

    #[test]
    fn duplicate_short_rejected_at_load() {
        let yaml = r#"
name: bad
command: bad
schema:
  options:
    a: { type: boolean, short: x }
    b: { type: boolean, short: x }
"#;
        let err = CliToolDefinition::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, RuntimeError::SchemaError(_)));
    }

    #[test]
    fn empty_array_emits_no_flags() {
        let tool = curl_tool();
        let mut args = HashMap::new();
        args.insert("url".to_string(), json!("https://e.com"));
        args.insert("header".to_string(), json!([]));
        let argv = tool.build_escape_hatch_argv(&args).unwrap();
        assert_eq!(argv, vec!["curl", "https://e.com"]);
    }
}
