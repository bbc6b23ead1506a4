//! Thin CLI front end over the execution-engine facade: `run` to execute a
//! source string or file, `tools`/`skills`/`artifacts`/`deps` for the
//! namespace CRUD, `serve` to run the container session server locally.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use skill_runtime::Session;

use skill_cli::{commands, config};

#[derive(Parser)]
#[command(name = "skill")]
#[command(about = "Execution engine for agent-submitted code: run, inspect, and manage a session")]
#[command(version)]
struct Cli {
    /// Path to the session config file (default: ./skill.toml)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a source string, or the contents of a file if the argument
    /// names one that exists
    Run {
        code: String,
        /// Timeout in seconds
        #[arg(short, long)]
        timeout: Option<f64>,
    },

    /// Inspect the tool registry
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Manage the skill library
    Skills {
        #[command(subcommand)]
        action: SkillsAction,
    },

    /// Manage session-scoped artifacts
    Artifacts {
        #[command(subcommand)]
        action: ArtifactsAction,
    },

    /// Manage declared runtime dependencies
    Deps {
        #[command(subcommand)]
        action: DepsAction,
    },

    /// Run the container session HTTP server locally
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Bearer token required on every request; falls back to
        /// SKILL_AUTH_TOKEN
        #[arg(long, env = "SKILL_AUTH_TOKEN")]
        token: Option<String>,
        /// Disable auth entirely (local development only)
        #[arg(long)]
        auth_disable: bool,
    },
}

#[derive(Subcommand)]
enum ToolsAction {
    /// List every registered tool
    List,
    /// Rank tools by relevance to a query
    Search {
        query: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum SkillsAction {
    /// List every stored skill
    List,
    /// Rank skills by relevance to a query
    Search {
        query: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Print a single skill's source and metadata
    Get { name: String },
    /// Add (or overwrite) a skill from a source file
    Add {
        name: String,
        source: PathBuf,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Remove a skill
    Remove { name: String },
}

#[derive(Subcommand)]
enum ArtifactsAction {
    /// List every stored artifact (without payload bytes)
    List,
    /// Save a file's contents as a named artifact
    Save {
        name: String,
        file: PathBuf,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Load a named artifact's payload to a file
    Load { name: String, out: PathBuf },
    /// Delete a named artifact
    Delete { name: String },
}

#[derive(Subcommand)]
enum DepsAction {
    /// List every declared dependency
    List,
    /// Declare a dependency and install it immediately
    Add { spec: String },
    /// Remove a declared dependency
    Remove { spec: String },
    /// Re-install every declared dependency that isn't already present
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("skill.toml"));

    let result = run(cli, config_path).await;

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli, config_path: PathBuf) -> Result<()> {
    if let Commands::Serve { ref host, port, ref token, auth_disable } = cli.command {
        let session_config = config::load(&config_path).await?;
        return commands::serve::run(session_config, host.clone(), port, token.clone(), auth_disable).await;
    }

    let session_config = config::load(&config_path).await?;
    let session = Session::open(session_config).await?;

    let outcome = match cli.command {
        Commands::Run { code, timeout } => commands::run::execute(&session, &code, timeout, cli.json).await,
        Commands::Tools { action } => match action {
            ToolsAction::List => commands::tools::list(&session, cli.json),
            ToolsAction::Search { query, limit } => commands::tools::search(&session, &query, limit, cli.json),
        },
        Commands::Skills { action } => match action {
            SkillsAction::List => commands::skills::list(&session, cli.json).await,
            SkillsAction::Search { query, limit } => commands::skills::search(&session, &query, limit, cli.json).await,
            SkillsAction::Get { name } => commands::skills::get(&session, &name, cli.json).await,
            SkillsAction::Add { name, source, description, overwrite } => {
                commands::skills::add(&session, &name, &source, description, overwrite).await
            }
            SkillsAction::Remove { name } => commands::skills::remove(&session, &name).await,
        },
        Commands::Artifacts { action } => match action {
            ArtifactsAction::List => commands::artifacts::list(&session, cli.json).await,
            ArtifactsAction::Save { name, file, description } => {
                commands::artifacts::save(&session, &name, &file, description).await
            }
            ArtifactsAction::Load { name, out } => commands::artifacts::load(&session, &name, &out).await,
            ArtifactsAction::Delete { name } => commands::artifacts::delete(&session, &name).await,
        },
        Commands::Deps { action } => match action {
            DepsAction::List => commands::deps::list(&session, cli.json).await,
            DepsAction::Add { spec } => commands::deps::add(&session, &spec).await,
            DepsAction::Remove { spec } => commands::deps::remove(&session, &spec).await,
            DepsAction::Sync => commands::deps::sync(&session, cli.json).await,
        },
        Commands::Serve { .. } => unreachable!("handled above"),
    };

    session.close().await?;
    outcome
}
