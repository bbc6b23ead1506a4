//! Security-relevant event log, distinct from general `tracing` output.
//!
//! Tool execution, dependency installs, and credential access are logged
//! here in addition to (not instead of) ordinary structured tracing, so a
//! security review can replay exactly which agent code touched which
//! capability without grepping the full application log.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    CredentialAccess,
    CredentialStore,
    CredentialDelete,
    ToolExecution,
    SkillCreate,
    SkillDelete,
    DepInstall,
    DepRemove,
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Name of the subject of the event: a tool, a skill, or a dep spec.
    pub subject: String,
    pub details: Option<String>,
    /// Redacted information (never contains actual secrets)
    pub metadata: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType, subject: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            subject: subject.into(),
            details: None,
            metadata: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Audit logger for security-sensitive operations
pub struct AuditLogger {
    log_file: Mutex<File>,
    log_path: PathBuf,
}

impl AuditLogger {
    /// Create a new audit logger writing under `~/.skill-engine/audit.log`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("failed to get home directory")?;
        Self::with_path(home.join(".skill-engine").join("audit.log"))
    }

    /// Create a logger writing to an explicit path (used by tests and by
    /// session configs that redirect state under a custom base directory).
    pub fn with_path(log_path: PathBuf) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("failed to open audit log: {}", log_path.display()))?;

        Ok(Self {
            log_file: Mutex::new(log_file),
            log_path,
        })
    }

    /// Log an audit event
    pub fn log(&self, entry: AuditEntry) -> Result<()> {
        let json = serde_json::to_string(&entry)?;

        let mut file = self
            .log_file
            .lock()
            .map_err(|e| anyhow::anyhow!("failed to lock audit log: {}", e))?;

        writeln!(file, "{}", json)?;
        file.flush()?;

        tracing::debug!(event = ?entry.event_type, subject = %entry.subject, "audit event logged");

        Ok(())
    }

    pub fn log_credential_access(&self, key_name: &str) -> Result<()> {
        self.log(
            AuditEntry::new(AuditEventType::CredentialAccess, key_name)
                .with_details("accessed credential"),
        )
    }

    pub fn log_credential_store(&self, key_name: &str) -> Result<()> {
        self.log(
            AuditEntry::new(AuditEventType::CredentialStore, key_name)
                .with_details("stored credential"),
        )
    }

    pub fn log_credential_delete(&self, key_name: &str) -> Result<()> {
        self.log(
            AuditEntry::new(AuditEventType::CredentialDelete, key_name)
                .with_details("deleted credential"),
        )
    }

    /// Log a tool invocation (CLI, RPC-stdio, or HTTP adapter).
    pub fn log_tool_execution(&self, tool: &str, recipe: Option<&str>, success: bool) -> Result<()> {
        let details = match recipe {
            Some(r) => format!("recipe={r} success={success}"),
            None => format!("escape-hatch success={success}"),
        };
        self.log(AuditEntry::new(AuditEventType::ToolExecution, tool).with_details(details))
    }

    pub fn log_skill_create(&self, name: &str) -> Result<()> {
        self.log(AuditEntry::new(AuditEventType::SkillCreate, name))
    }

    pub fn log_skill_delete(&self, name: &str) -> Result<()> {
        self.log(AuditEntry::new(AuditEventType::SkillDelete, name))
    }

    pub fn log_dep_install(&self, spec: &str, success: bool) -> Result<()> {
        self.log(
            AuditEntry::new(AuditEventType::DepInstall, spec)
                .with_details(format!("success={success}")),
        )
    }

    pub fn log_dep_remove(&self, spec: &str) -> Result<()> {
        self.log(AuditEntry::new(AuditEventType::DepRemove, spec))
    }

    /// Get the audit log path
    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    /// Read recent audit entries
    pub fn read_recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        use std::io::{BufRead, BufReader};

        let file = File::open(&self.log_path)?;
        let reader = BufReader::new(file);

        let entries: Vec<AuditEntry> = reader
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        Ok(entries.into_iter().rev().take(limit).rev().collect())
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new().expect("failed to create AuditLogger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_audit_entry_creation() {
        let entry = AuditEntry::new(AuditEventType::ToolExecution, "curl").with_details("ok");

        assert_eq!(entry.subject, "curl");
        assert_eq!(entry.details, Some("ok".to_string()));
    }

    #[test]
    fn test_audit_entry_serialization() {
        let entry = AuditEntry::new(AuditEventType::SkillCreate, "fetch_json");

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: AuditEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.subject, entry.subject);
    }

    #[test]
    fn test_log_and_read_recent() {
        let dir = TempDir::new().unwrap();
        let logger = AuditLogger::with_path(dir.path().join("audit.log")).unwrap();

        logger.log_tool_execution("curl", Some("get"), true).unwrap();
        logger.log_dep_install("pkg-a", true).unwrap();

        let recent = logger.read_recent(10).unwrap();
        assert_eq!(recent.len(), 2);
    }
}
