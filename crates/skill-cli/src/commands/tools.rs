//! `skill tools list|search` — read-only views over the tool registry.

use anyhow::Result;
use skill_runtime::{Session, ToolSummary};

pub fn list(session: &Session, json: bool) -> Result<()> {
    let tools = session.list_tools()?;
    print_tools(&tools, json)
}

pub fn search(session: &Session, query: &str, limit: usize, json: bool) -> Result<()> {
    let tools = session.search_tools(query, limit)?;
    print_tools(&tools, json)
}

fn print_tools(tools: &[ToolSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tools)?);
        return Ok(());
    }
    if tools.is_empty() {
        println!("no tools found");
        return Ok(());
    }
    for tool in tools {
        println!("{}  {}", tool.name, tool.description);
        if !tool.tags.is_empty() {
            println!("  tags: {}", tool.tags.join(", "));
        }
        if !tool.recipe_names.is_empty() {
            println!("  recipes: {}", tool.recipe_names.join(", "));
        }
    }
    Ok(())
}
