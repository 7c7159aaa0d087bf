use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phasegate::hooks::HookEvent;
use phasegate::phase::{Role, WorkflowPhase};
use phasegate::session::Session;
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "phasegate")]
#[command(version, about = "Phase gate and checkpoint relay for multi-worker TDD workflows")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Coordination directory (defaults to ./.tmops)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Feature being worked on. Overrides PHASEGATE_FEATURE.
    #[arg(long, global = true)]
    pub feature: Option<String>,

    /// Role of this worker: orchestrator, tester, implementer, verifier. Overrides PHASEGATE_ROLE.
    #[arg(long, global = true)]
    pub role: Option<Role>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Block until a checkpoint matching a glob pattern exists, then print it
    Wait {
        /// Glob pattern, e.g. "*_testing_complete.md"
        pattern: String,
        /// Seconds to wait before giving up (default from config, 300)
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Create a checkpoint (no-op if the name already exists)
    Create {
        name: String,
        content: String,
        /// Structured metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// List checkpoints of the current run
    List,
    /// Print one checkpoint
    Get { name: String },
    /// Show run information as JSON
    Info,
    /// Start a session for a feature
    Init { feature: String },
    /// Show the current workflow state
    Status,
    /// Move the workflow to the next phase (orchestrator decision)
    Advance { phase: WorkflowPhase },
    /// End the current session
    End,
    /// Answer a host hook: JSON on stdin, decision on stdout
    Hook { event: HookEvent },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let session = match cli.root.clone() {
        Some(root) => Session::new(root),
        None => Session::for_project(
            std::env::current_dir().context("Failed to get current directory")?,
        ),
    };

    if let Commands::Hook { event } = &cli.command {
        // Hooks must always answer, so they never fail on config or logging.
        return cmd::cmd_hook(&cli, session, *event).await;
    }

    let ctx = cmd::Context::load(&cli, session)?;
    let _log_guard = ctx.init_logging(cli.verbose, &cli.command)?;

    match &cli.command {
        Commands::Wait { pattern, timeout } => cmd::cmd_wait(&ctx, pattern, *timeout).await?,
        Commands::Create {
            name,
            content,
            metadata,
        } => cmd::cmd_create(&ctx, name, content, metadata.as_deref())?,
        Commands::List => cmd::cmd_list(&ctx)?,
        Commands::Get { name } => cmd::cmd_get(&ctx, name)?,
        Commands::Info => cmd::cmd_info(&ctx)?,
        Commands::Init { feature } => cmd::cmd_init(&ctx, feature)?,
        Commands::Status => cmd::cmd_status(&ctx)?,
        Commands::Advance { phase } => cmd::cmd_advance(&ctx, *phase)?,
        Commands::End => cmd::cmd_end(&ctx)?,
        Commands::Config { command } => cmd::cmd_config(&ctx, command.clone())?,
        Commands::Hook { .. } => unreachable!("handled above"),
    }

    Ok(())
}
