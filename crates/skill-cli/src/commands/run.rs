//! `skill run` — execute a source string (or a file's contents) in an
//! in-process session and print the resulting [`skill_runtime::ExecutionResult`].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use skill_runtime::Session;

pub async fn execute(session: &Session, code_or_path: &str, timeout_secs: Option<f64>, json: bool) -> Result<()> {
    let code = if PathBuf::from(code_or_path).is_file() {
        std::fs::read_to_string(code_or_path)?
    } else {
        code_or_path.to_string()
    };

    let timeout = timeout_secs.map(Duration::from_secs_f64);
    let result = session.run(&code, timeout).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr.red());
    }
    match &result.error {
        Some(err) => {
            eprintln!("{} {}: {}", "error".red().bold(), err.kind, err.message);
        }
        None => {
            println!("{} {}", "=>".dimmed(), result.value);
        }
    }
    eprintln!("{}", format!("({} ms)", result.duration_ms).dimmed());

    if result.error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}
