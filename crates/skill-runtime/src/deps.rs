//! Dependency controller (spec §4.F): validation, policy gating, atomic
//! rollback on install failure, and the pluggable package installer.
//!
//! Grounded in the teacher's "shell out, capture stdout/stderr/exit code"
//! idiom (`docker_runtime::DockerRuntime::execute`), generalized here to a
//! configurable package-manager command — `luarocks` by default, the
//! natural counterpart to the `mlua` scripting substrate.

use std::process::Stdio;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::errors::{Result, RuntimeError};
use skill_context::{Dep, Storage};

/// Outcome of a single `deps.add` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Installed,
    AlreadyPresent,
}

/// Outcome of `install(specs)` — the installer contract (spec §4.F, §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub already_present: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// `install(specs) -> {installed, already_present, failed}`. Implementations
/// may shell out, use a native library, or drive a manifest file; the only
/// contract is "package importable after success" (spec §9).
#[async_trait::async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, specs: &[String]) -> Result<InstallReport>;
    /// Whether `spec`'s package name is already importable in the target
    /// environment, used by `sync()` to skip already-satisfied deps.
    async fn is_importable(&self, name: &str) -> bool;
}

/// Shells out to a configured package manager command (`luarocks install
/// <spec>` by default) once per spec.
pub struct ShellInstaller {
    pub command: String,
    pub install_args: Vec<String>,
}

impl Default for ShellInstaller {
    fn default() -> Self {
        Self {
            command: "luarocks".to_string(),
            install_args: vec!["install".to_string()],
        }
    }
}

#[async_trait::async_trait]
impl Installer for ShellInstaller {
    async fn install(&self, specs: &[String]) -> Result<InstallReport> {
        let mut report = InstallReport::default();
        for spec in specs {
            let mut command = Command::new(&self.command);
            command
                .args(&self.install_args)
                .arg(spec)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            match command.output().await {
                Ok(output) if output.status.success() => report.installed.push(spec.clone()),
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                    report.failed.push((spec.clone(), stderr));
                }
                Err(e) => report.failed.push((spec.clone(), e.to_string())),
            }
        }
        Ok(report)
    }

    async fn is_importable(&self, name: &str) -> bool {
        Command::new(&self.command)
            .args(["show", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Whether `deps.add`/`deps.remove` are permitted at runtime. `sync()` is
/// always permitted regardless (spec §4.F: "sync is pre-declared intent").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepsPolicy {
    Allow,
    Disallow,
}

/// Wire-serializable description of the deps controller a bootstrap should
/// construct: the policy plus which package-manager command backs the
/// installer. Crosses the process boundary in the subprocess/container
/// bootstrap message (spec §4.H) since a `dyn Installer` cannot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepsConfig {
    pub policy: DepsPolicy,
    #[serde(default = "default_installer_command")]
    pub installer_command: String,
    #[serde(default = "default_installer_args")]
    pub installer_args: Vec<String>,
}

fn default_installer_command() -> String {
    "luarocks".to_string()
}

fn default_installer_args() -> Vec<String> {
    vec!["install".to_string()]
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            policy: DepsPolicy::Allow,
            installer_command: default_installer_command(),
            installer_args: default_installer_args(),
        }
    }
}

impl DepsConfig {
    pub fn installer(&self) -> ShellInstaller {
        ShellInstaller {
            command: self.installer_command.clone(),
            install_args: self.installer_args.clone(),
        }
    }
}

/// Validates, installs, persists, and policy-gates declared package
/// requirements.
pub struct DepsController {
    storage: Arc<dyn Storage>,
    installer: Arc<dyn Installer>,
    policy: DepsPolicy,
    spec_re: Regex,
}

impl DepsController {
    pub fn new(storage: Arc<dyn Storage>, installer: Arc<dyn Installer>, policy: DepsPolicy) -> Self {
        Self {
            storage,
            installer,
            policy,
            // name( version-op version )? — reject @, ;, whitespace-separated
            // markers, and URL schemes by construction (none of those chars
            // are in the allowed character classes).
            spec_re: Regex::new(r"^[A-Za-z0-9_.\-]+(?:(?:==|>=|<=|~=|>|<|!=)[A-Za-z0-9_.\-]+)?$").unwrap(),
        }
    }

    fn validate(&self, spec: &str) -> Result<()> {
        if spec.contains('@') || spec.contains(';') || spec.contains(char::is_whitespace) {
            return Err(RuntimeError::InvalidDepSpec(format!(
                "'{spec}' contains a disallowed character (@, ;, or whitespace)"
            )));
        }
        if spec.contains("://") {
            return Err(RuntimeError::InvalidDepSpec(format!("'{spec}' looks like a URL install, which is rejected")));
        }
        if !self.spec_re.is_match(spec) {
            return Err(RuntimeError::InvalidDepSpec(format!(
                "'{spec}' does not match 'name(version-op version)?'"
            )));
        }
        Ok(())
    }

    /// `deps.add(spec)` (spec §4.F steps 1-4).
    pub async fn add(&self, spec: &str) -> Result<AddOutcome> {
        self.validate(spec)?;
        if self.policy == DepsPolicy::Disallow {
            return Err(RuntimeError::RuntimeDepsDisabled);
        }
        let dep = Dep { spec: spec.to_string() };
        let name = dep.name().to_string();

        let previous = self.storage.list_deps().await?;
        self.storage.put_dep(dep).await?;

        let report = self.installer.install(&[spec.to_string()]).await?;
        if let Some((_, reason)) = report.failed.first() {
            // Atomic rollback: restore whatever constraint (if any) existed
            // for this package name before the failed add.
            match previous.into_iter().find(|d| d.name() == name) {
                Some(prior) => {
                    self.storage.put_dep(prior).await?;
                }
                None => {
                    self.storage.delete_dep(&name).await?;
                }
            }
            return Err(RuntimeError::InstallFailed(reason.clone()));
        }

        Ok(if report.installed.iter().any(|s| s == spec) {
            AddOutcome::Installed
        } else {
            AddOutcome::AlreadyPresent
        })
    }

    /// `deps.remove(spec)` — policy-gated the same way as `add`; removes
    /// only from the declared-deps store, never uninstalls from the
    /// environment (spec §9, "Open question — deps removal semantics").
    pub async fn remove(&self, spec: &str) -> Result<bool> {
        if self.policy == DepsPolicy::Disallow {
            return Err(RuntimeError::RuntimeDepsDisabled);
        }
        let name = Dep { spec: spec.to_string() }.name().to_string();
        Ok(self.storage.delete_dep(&name).await?)
    }

    /// `deps.sync()` — always permitted; installs any declared dep not
    /// currently importable. Idempotent: a second call is a no-op.
    pub async fn sync(&self) -> Result<InstallReport> {
        let deps = self.storage.list_deps().await?;
        let mut to_install = Vec::new();
        let mut already_present = Vec::new();
        for dep in &deps {
            if self.installer.is_importable(dep.name()).await {
                already_present.push(dep.spec.clone());
            } else {
                to_install.push(dep.spec.clone());
            }
        }
        let mut report = if to_install.is_empty() {
            InstallReport::default()
        } else {
            self.installer.install(&to_install).await?
        };
        report.already_present.extend(already_present);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skill_context::FileStorage;
    use std::sync::Mutex;

    struct FakeInstaller {
        fail: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Installer for FakeInstaller {
        async fn install(&self, specs: &[String]) -> Result<InstallReport> {
            self.calls.lock().unwrap().extend(specs.iter().cloned());
            let mut report = InstallReport::default();
            for spec in specs {
                let name = Dep { spec: spec.clone() }.name().to_string();
                if self.fail.contains(&name) {
                    report.failed.push((spec.clone(), "simulated failure".to_string()));
                } else {
                    report.installed.push(spec.clone());
                }
            }
            Ok(report)
        }

        async fn is_importable(&self, _name: &str) -> bool {
            false
        }
    }

    fn controller(policy: DepsPolicy, fail: Vec<&str>) -> (tempfile::TempDir, DepsController) {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path()).unwrap());
        let installer = Arc::new(FakeInstaller {
            fail: fail.into_iter().map(String::from).collect(),
            calls: Mutex::new(Vec::new()),
        });
        (dir, DepsController::new(storage, installer, policy))
    }

    #[tokio::test]
    async fn rejects_url_and_marker_specs() {
        let (_dir, ctrl) = controller(DepsPolicy::Allow, vec![]);
        assert!(matches!(ctrl.add("pkg @ git+https://x").await, Err(RuntimeError::InvalidDepSpec(_))));
        assert!(matches!(ctrl.add("pkg; os.system('x')").await, Err(RuntimeError::InvalidDepSpec(_))));
        assert!(matches!(ctrl.add("git+https://example.com/pkg").await, Err(RuntimeError::InvalidDepSpec(_))));
    }

    #[tokio::test]
    async fn s5_disallowed_policy_blocks_add_but_allows_sync() {
        let (_dir, ctrl) = controller(DepsPolicy::Disallow, vec![]);
        ctrl.storage.put_dep(Dep { spec: "pkg-a==1.0".to_string() }).await.unwrap();
        assert_eq!(ctrl.storage.list_deps().await.unwrap().len(), 1);

        let err = ctrl.add("pkg-b").await.unwrap_err();
        assert!(matches!(err, RuntimeError::RuntimeDepsDisabled));
        assert_eq!(ctrl.storage.list_deps().await.unwrap().len(), 1);

        // sync is always permitted even when add/remove are disallowed.
        let report = ctrl.sync().await.unwrap();
        assert!(report.installed.contains(&"pkg-a==1.0".to_string()));
    }

    #[tokio::test]
    async fn i8_failed_install_rolls_back_store() {
        let (_dir, ctrl) = controller(DepsPolicy::Allow, vec!["pkg-c"]);
        let before = ctrl.storage.list_deps().await.unwrap();
        let err = ctrl.add("pkg-c").await.unwrap_err();
        assert!(matches!(err, RuntimeError::InstallFailed(_)));
        let after = ctrl.storage.list_deps().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn sync_is_idempotent() {
        let (_dir, ctrl) = controller(DepsPolicy::Allow, vec![]);
        ctrl.storage.put_dep(Dep { spec: "pkg-a".to_string() }).await.unwrap();
        let first = ctrl.sync().await.unwrap();
        assert_eq!(first.installed, vec!["pkg-a".to_string()]);
        // installer always reports "not importable" in this fake, so a real
        // idempotent backend would report already_present on round two; the
        // store itself is unchanged either way.
        let deps_after = ctrl.storage.list_deps().await.unwrap();
        assert_eq!(deps_after.len(), 1);
    }
}
