//! The agent-visible `tools` / `skills` / `artifacts` / `deps` dispatchers
//! (spec §4.D).
//!
//! Each is a thin proxy over the corresponding subsystem (`tool_registry`,
//! `skills`, the `skill_context::Storage` trait, `deps`). Dynamic dispatch —
//! `tools.X`, `tools.X.Y(...)`, `skills.X(...)` — is implemented as the
//! builder pattern spec.md §9 prescribes for static languages: `ToolsHandle`
//! exposes an `invoke(tool, recipe, args)` entry point plus `.get(tool)` /
//! `.get(recipe)` stages that resolve attribute chains one hop at a time.
//! The same objects are also `mlua::UserData`, so the identical dispatch
//! logic drives both the Rust-side facade (`Session`, the subprocess kernel)
//! and the Lua-visible globals an agent's chunk actually sees.
//!
//! Sync/async duality (spec §4.D, design note in §9): Rust callers get plain
//! `async fn`s (`call_async`); the Lua `__call` metamethod always resolves
//! synchronously by blocking the calling OS thread on a `tokio::runtime::Handle`,
//! since Lua has no concept of awaiting a future and Rust has no reliable
//! "am I inside an async frame" probe to make the choice automatically.

use std::collections::HashMap;
use std::sync::Arc;

use mlua::{Lua, UserData, UserDataMethods, Value as LuaValue};
use serde_json::Value;

use crate::deps::DepsController;
use crate::errors::{Result, RuntimeError};
use crate::skills::SkillLibrary;
use crate::tool_registry::ToolRegistry;
use crate::types::{Dep, Tool, ToolSummary};
use skill_context::{Artifact, ArtifactSummary, Storage};

/// Everything a running executor needs to answer `tools`/`skills`/`artifacts`/`deps`
/// calls. Cheaply cloneable; every handle below holds one of these by `Arc`.
#[derive(Clone)]
pub struct NamespaceDict {
    pub tools: Arc<ToolRegistry>,
    pub skills: Arc<SkillLibrary>,
    pub storage: Arc<dyn Storage>,
    pub deps: Arc<DepsController>,
    pub runtime: tokio::runtime::Handle,
}

impl NamespaceDict {
    /// Install `tools`, `skills`, `artifacts`, `deps` as globals on `lua`.
    /// The single point where a Lua chunk's visible capability surface is
    /// constructed — called identically by the in-process executor and by
    /// the subprocess kernel after it reconstructs a [`NamespaceDict`] from
    /// a bootstrap message.
    pub fn install(&self, lua: &Lua) -> Result<()> {
        lua.globals().set("tools", ToolsHandle { ns: self.clone() })?;
        lua.globals().set("skills", SkillsHandle { ns: self.clone() })?;
        lua.globals().set("artifacts", ArtifactsHandle { ns: self.clone() })?;
        lua.globals().set("deps", DepsHandle { ns: self.clone() })?;
        Ok(())
    }

    fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        tokio::task::block_in_place(|| self.runtime.block_on(fut))
    }
}

fn args_from_lua(lua: &Lua, value: Option<LuaValue>) -> Result<HashMap<String, Value>> {
    match value {
        None | Some(LuaValue::Nil) => Ok(HashMap::new()),
        Some(table @ LuaValue::Table(_)) => {
            let json: Value = lua
                .from_value(table)
                .map_err(|e| RuntimeError::ArgumentTypeError(format!("expected a keyword table: {e}")))?;
            match json {
                Value::Object(map) => Ok(map.into_iter().collect()),
                Value::Null => Ok(HashMap::new()),
                other => Err(RuntimeError::ArgumentTypeError(format!(
                    "expected a keyword table, got {other}"
                ))),
            }
        }
        Some(other) => Err(RuntimeError::ArgumentTypeError(format!(
            "expected a keyword table, got {other:?}"
        ))),
    }
}

fn value_to_lua(lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
    lua.to_value(value)
}

// ---------------------------------------------------------------------
// tools
// ---------------------------------------------------------------------

/// `tools` — attribute access `tools.X` yields a [`ToolHandle`]; `tools.list()`
/// and `tools.search(query)` are the two fixed methods.
#[derive(Clone)]
pub struct ToolsHandle {
    pub ns: NamespaceDict,
}

impl ToolsHandle {
    pub fn list(&self) -> Vec<ToolSummary> {
        self.ns.tools.list().iter().map(Tool::summary).collect()
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<ToolSummary> {
        self.ns.tools.search(query, limit).iter().map(Tool::summary).collect()
    }

    /// `.get(tool_name)` — first stage of the builder-pattern dispatch.
    pub fn get(&self, tool_name: &str) -> ToolHandle {
        ToolHandle {
            ns: self.ns.clone(),
            tool: tool_name.to_string(),
        }
    }

    /// The central entry point both Rust callers and the Lua metatables
    /// route through: `invoke(tool, recipe, args)`.
    pub async fn invoke(&self, tool: &str, recipe: Option<&str>, args: HashMap<String, Value>) -> Result<Value> {
        self.ns.tools.call(tool, recipe, args).await
    }
}

impl UserData for ToolsHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("list", |lua, this, ()| {
            lua.to_value(&this.list())
        });
        methods.add_method("search", |lua, this, (query, limit): (String, Option<usize>)| {
            lua.to_value(&this.search(&query, limit.unwrap_or(10)))
        });
        // `list`/`search` above are registered as regular methods, which
        // mlua resolves before falling back to this meta `__index` — so this
        // branch only ever sees a dynamic tool name.
        methods.add_meta_method("__index", |_, this, key: String| {
            Ok(ToolHandle {
                ns: this.ns.clone(),
                tool: key,
            })
        });
    }
}

/// `tools.X` — second stage: `tools.X(**kwargs)` is the escape hatch,
/// `tools.X.Y` resolves to a [`RecipeHandle`].
#[derive(Clone)]
pub struct ToolHandle {
    pub ns: NamespaceDict,
    pub tool: String,
}

impl ToolHandle {
    pub fn get(&self, recipe_name: &str) -> RecipeHandle {
        RecipeHandle {
            ns: self.ns.clone(),
            tool: self.tool.clone(),
            recipe: recipe_name.to_string(),
        }
    }

    pub async fn call_async(&self, args: HashMap<String, Value>) -> Result<Value> {
        self.ns.tools.call(&self.tool, None, args).await
    }

    pub fn call_sync(&self, args: HashMap<String, Value>) -> Result<Value> {
        self.ns.block_on(self.call_async(args))
    }
}

impl UserData for ToolHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("call_sync", |lua, this, kwargs: Option<LuaValue>| {
            let args = args_from_lua(lua, kwargs).map_err(mlua::Error::external)?;
            let value = this.call_sync(args).map_err(mlua::Error::external)?;
            value_to_lua(lua, &value)
        });
        methods.add_meta_method("__call", |lua, this, kwargs: Option<LuaValue>| {
            let args = args_from_lua(lua, kwargs).map_err(mlua::Error::external)?;
            let value = this.call_sync(args).map_err(mlua::Error::external)?;
            value_to_lua(lua, &value)
        });
        methods.add_meta_method("__index", |_, this, key: String| Ok(this.get(&key)));
    }
}

/// `tools.X.Y` — a resolved recipe invocation.
#[derive(Clone)]
pub struct RecipeHandle {
    pub ns: NamespaceDict,
    pub tool: String,
    pub recipe: String,
}

impl RecipeHandle {
    pub async fn call_async(&self, args: HashMap<String, Value>) -> Result<Value> {
        self.ns.tools.call(&self.tool, Some(&self.recipe), args).await
    }

    pub fn call_sync(&self, args: HashMap<String, Value>) -> Result<Value> {
        self.ns.block_on(self.call_async(args))
    }
}

impl UserData for RecipeHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("call_sync", |lua, this, kwargs: Option<LuaValue>| {
            let args = args_from_lua(lua, kwargs).map_err(mlua::Error::external)?;
            let value = this.call_sync(args).map_err(mlua::Error::external)?;
            value_to_lua(lua, &value)
        });
        methods.add_meta_method("__call", |lua, this, kwargs: Option<LuaValue>| {
            let args = args_from_lua(lua, kwargs).map_err(mlua::Error::external)?;
            let value = this.call_sync(args).map_err(mlua::Error::external)?;
            value_to_lua(lua, &value)
        });
    }
}

// ---------------------------------------------------------------------
// skills
// ---------------------------------------------------------------------

/// `skills` — `skills.X(**kwargs)` invokes skill `X` directly; the fixed
/// methods (`invoke`, `search`, `create`, `delete`, `get`, `list`) are
/// checked first in `__index` so a skill literally named e.g. `list` is
/// still reachable only via `skills.invoke("list", ...)`.
#[derive(Clone)]
pub struct SkillsHandle {
    pub ns: NamespaceDict,
}

impl SkillsHandle {
    pub async fn invoke(&self, name: &str, args: HashMap<String, Value>) -> Result<Value> {
        self.ns.skills.invoke(name, args, &self.ns).await
    }
}

impl UserData for SkillsHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("list", |lua, this, ()| lua.to_value(&this.ns.skills.list()));
        methods.add_method("get", |lua, this, name: String| {
            let record = this.ns.skills.get(&name).map_err(mlua::Error::external)?;
            lua.to_value(&record)
        });
        methods.add_method("search", |lua, this, (query, limit): (String, Option<usize>)| {
            let results = this.ns.block_on(this.ns.skills.search(&query, limit.unwrap_or(5)));
            lua.to_value(&results)
        });
        methods.add_method(
            "create",
            |lua, this, (name, source, description): (String, String, Option<String>)| {
                let summary = this
                    .ns
                    .block_on(this.ns.skills.create(&name, source, description, false))
                    .map_err(mlua::Error::external)?;
                lua.to_value(&summary)
            },
        );
        methods.add_method("delete", |_, this, name: String| {
            Ok(this.ns.block_on(this.ns.skills.delete(&name)).map_err(mlua::Error::external)?)
        });
        methods.add_method("invoke", |lua, this, (name, kwargs): (String, Option<LuaValue>)| {
            let args = args_from_lua(lua, kwargs).map_err(mlua::Error::external)?;
            let value = this.ns.block_on(this.invoke(&name, args)).map_err(mlua::Error::external)?;
            value_to_lua(lua, &value)
        });
        // As with `ToolsHandle`, the fixed methods above shadow their own
        // names; this fallback only sees a dynamic skill name.
        methods.add_meta_method("__index", |_, this, key: String| {
            Ok(SkillHandle {
                ns: this.ns.clone(),
                name: key,
            })
        });
    }
}

/// A resolved `skills.X` — calling it invokes the skill.
#[derive(Clone)]
pub struct SkillHandle {
    pub ns: NamespaceDict,
    pub name: String,
}

impl UserData for SkillHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method("__call", |lua, this, kwargs: Option<LuaValue>| {
            let args = args_from_lua(lua, kwargs).map_err(mlua::Error::external)?;
            let value = this
                .ns
                .block_on(this.ns.skills.invoke(&this.name, args, &this.ns))
                .map_err(mlua::Error::external)?;
            value_to_lua(lua, &value)
        });
    }
}

// ---------------------------------------------------------------------
// artifacts
// ---------------------------------------------------------------------

/// `artifacts` — `save`/`load`/`list`/`delete`. No dynamic dispatch: these
/// four methods are the entire surface (spec §4.D).
#[derive(Clone)]
pub struct ArtifactsHandle {
    pub ns: NamespaceDict,
}

impl ArtifactsHandle {
    pub async fn save(
        &self,
        name: &str,
        data: Vec<u8>,
        description: Option<String>,
        metadata: HashMap<String, Value>,
    ) -> Result<ArtifactSummary> {
        if name.is_empty() {
            return Err(RuntimeError::InvalidRequest("artifact name must be non-empty".into()));
        }
        let artifact = Artifact {
            name: name.to_string(),
            data,
            description: description.unwrap_or_default(),
            metadata,
            created_at: chrono::Utc::now(),
        };
        self.ns.storage.put_artifact(&artifact).await?;
        Ok(ArtifactSummary::from(&artifact))
    }

    pub async fn load(&self, name: &str) -> Result<Artifact> {
        Ok(self.ns.storage.get_artifact(name).await?)
    }

    pub async fn list(&self) -> Result<Vec<ArtifactSummary>> {
        Ok(self.ns.storage.list_artifacts().await?)
    }

    pub async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.ns.storage.delete_artifact(name).await?)
    }
}

impl UserData for ArtifactsHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method(
            "save",
            |lua, this, (name, data, description, metadata): (String, mlua::String, Option<String>, Option<LuaValue>)| {
                let metadata: HashMap<String, Value> = match metadata {
                    Some(v) => lua.from_value(v).map_err(mlua::Error::external)?,
                    None => HashMap::new(),
                };
                let bytes = data.as_bytes().to_vec();
                let summary = this
                    .ns
                    .block_on(this.save(&name, bytes, description, metadata))
                    .map_err(mlua::Error::external)?;
                lua.to_value(&summary)
            },
        );
        methods.add_method("load", |lua, this, name: String| {
            let artifact = this.ns.block_on(this.load(&name)).map_err(mlua::Error::external)?;
            let table = lua.create_table()?;
            table.set("name", artifact.name)?;
            table.set("data", lua.create_string(&artifact.data)?)?;
            table.set("description", artifact.description)?;
            table.set("metadata", lua.to_value(&artifact.metadata)?)?;
            table.set("created_at", artifact.created_at.to_rfc3339())?;
            Ok(table)
        });
        methods.add_method("list", |lua, this, ()| {
            let list = this.ns.block_on(this.list()).map_err(mlua::Error::external)?;
            lua.to_value(&list)
        });
        methods.add_method("delete", |_, this, name: String| {
            Ok(this.ns.block_on(this.delete(&name)).map_err(mlua::Error::external)?)
        });
    }
}

// ---------------------------------------------------------------------
// deps
// ---------------------------------------------------------------------

/// `deps` — the controlled wrapper spec §4.F requires: `add`/`remove` are
/// policy-gated, `list`/`sync` always forward. Internal fields are not
/// exposed to Lua at all (there is no `__index` escape hatch here), which
/// is the Rust-side equivalent of the spec's "private attribute access
/// raises AttributeError".
#[derive(Clone)]
pub struct DepsHandle {
    pub ns: NamespaceDict,
}

impl UserData for DepsHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("add", |lua, this, spec: String| {
            let outcome = this.ns.block_on(this.ns.deps.add(&spec)).map_err(mlua::Error::external)?;
            lua.to_value(&outcome)
        });
        methods.add_method("remove", |_, this, spec: String| {
            Ok(this.ns.block_on(this.ns.deps.remove(&spec)).map_err(mlua::Error::external)?)
        });
        methods.add_method("list", |lua, this, ()| {
            let deps: Vec<Dep> = this.ns.block_on(this.ns.storage.list_deps()).map_err(mlua::Error::external)?;
            lua.to_value(&deps.into_iter().map(|d| d.spec).collect::<Vec<_>>())
        });
        methods.add_method("sync", |lua, this, ()| {
            let outcome = this.ns.block_on(this.ns.deps.sync()).map_err(mlua::Error::external)?;
            lua.to_value(&outcome)
        });
    }
}
