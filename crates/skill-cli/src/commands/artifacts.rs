//! `skill artifacts list|save|load|delete` — CRUD over session-scoped
//! artifact storage.

use std::path::Path;

use anyhow::Result;
use skill_context::Artifact;
use skill_runtime::Session;

pub async fn list(session: &Session, json: bool) -> Result<()> {
    let artifacts = session.list_artifacts().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
        return Ok(());
    }
    if artifacts.is_empty() {
        println!("no artifacts found");
        return Ok(());
    }
    for artifact in artifacts {
        println!("{}  {} bytes  {}", artifact.name, artifact.size_bytes, artifact.description);
    }
    Ok(())
}

pub async fn save(session: &Session, name: &str, file_path: &Path, description: Option<String>) -> Result<()> {
    let data = std::fs::read(file_path)?;
    let artifact = Artifact {
        name: name.to_string(),
        data,
        description: description.unwrap_or_default(),
        metadata: Default::default(),
        created_at: chrono::Utc::now(),
    };
    session.save_artifact(&artifact).await?;
    println!("saved artifact '{name}'");
    Ok(())
}

pub async fn load(session: &Session, name: &str, out_path: &Path) -> Result<()> {
    let artifact = session.load_artifact(name).await?;
    std::fs::write(out_path, artifact.data)?;
    println!("wrote '{}' to {}", artifact.name, out_path.display());
    Ok(())
}

pub async fn delete(session: &Session, name: &str) -> Result<()> {
    let existed = session.delete_artifact(name).await?;
    if existed {
        println!("deleted artifact '{name}'");
    } else {
        println!("no such artifact '{name}'");
    }
    Ok(())
}
