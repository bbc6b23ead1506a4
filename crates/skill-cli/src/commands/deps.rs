//! `skill deps list|add|remove|sync` — the dependency controller front end.

use anyhow::Result;
use skill_runtime::AddOutcome;
use skill_runtime::Session;

pub async fn list(session: &Session, json: bool) -> Result<()> {
    let deps = session.list_deps().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&deps)?);
        return Ok(());
    }
    if deps.is_empty() {
        println!("no declared dependencies");
        return Ok(());
    }
    for dep in deps {
        println!("{}", dep.spec);
    }
    Ok(())
}

pub async fn add(session: &Session, spec: &str) -> Result<()> {
    match session.add_dep(spec).await? {
        AddOutcome::Installed => println!("installed '{spec}'"),
        AddOutcome::AlreadyPresent => println!("'{spec}' already present"),
    }
    Ok(())
}

pub async fn remove(session: &Session, spec: &str) -> Result<()> {
    let existed = session.remove_dep(spec).await?;
    if existed {
        println!("removed '{spec}'");
    } else {
        println!("no such dependency '{spec}'");
    }
    Ok(())
}

pub async fn sync(session: &Session, json: bool) -> Result<()> {
    let report = session.sync_deps().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for name in &report.installed {
        println!("installed {name}");
    }
    for name in &report.already_present {
        println!("already present {name}");
    }
    for (name, err) in &report.failed {
        eprintln!("failed {name}: {err}");
    }
    if !report.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
