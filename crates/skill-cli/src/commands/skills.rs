//! `skill skills list|search|get|add|remove` — CRUD and search over the
//! skill library.

use anyhow::Result;
use skill_runtime::{Session, SkillRecord, SkillSearchResult};
use skill_context::SkillSummary;

pub async fn list(session: &Session, json: bool) -> Result<()> {
    let skills = session.list_skills().await?;
    print_summaries(&skills, json)
}

pub async fn search(session: &Session, query: &str, limit: usize, json: bool) -> Result<()> {
    let results = session.search_skills(query, limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("no skills found");
        return Ok(());
    }
    for SkillSearchResult { summary, score } in &results {
        println!("{:.3}  {}  {}", score, summary.name, summary.description);
    }
    Ok(())
}

pub async fn get(session: &Session, name: &str, json: bool) -> Result<()> {
    let skill: SkillRecord = session.get_skill(name).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&skill)?);
        return Ok(());
    }
    println!("{}  {}", skill.name, skill.description);
    println!("created: {}", skill.created_at);
    if !skill.parameters.is_empty() {
        println!("parameters:");
        for param in &skill.parameters {
            println!("  {}: {}", param.name, param.description);
        }
    }
    println!("---");
    println!("{}", skill.source);
    Ok(())
}

pub async fn add(
    session: &Session,
    name: &str,
    source_path: &std::path::Path,
    description: Option<String>,
    overwrite: bool,
) -> Result<()> {
    let source = std::fs::read_to_string(source_path)?;
    let summary = session.add_skill(name, source, description, overwrite).await?;
    println!("added skill '{}'", summary.name);
    Ok(())
}

pub async fn remove(session: &Session, name: &str) -> Result<()> {
    let existed = session.remove_skill(name).await?;
    if existed {
        println!("removed skill '{name}'");
    } else {
        println!("no such skill '{name}'");
    }
    Ok(())
}

fn print_summaries(skills: &[SkillSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(skills)?);
        return Ok(());
    }
    if skills.is_empty() {
        println!("no skills found");
        return Ok(());
    }
    for skill in skills {
        match &skill.error {
            Some(err) => println!("{}  (invalid: {})", skill.name, err),
            None => println!("{}  {}", skill.name, skill.description),
        }
    }
    Ok(())
}
