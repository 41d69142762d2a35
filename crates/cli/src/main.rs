//! AgentRelay CLI: the main entry point.
//!
//! Commands:
//! - `init`      Create the config file and data directories
//! - `run`       Run one agent's workflow
//! - `emit`      Emit an event and act on its trigger rule
//! - `process`   Dispatch the top of today's backlog
//! - `events`    Show recent events
//! - `agents`    List installed agents
//! - `skills`    List or show skills
//! - `status`    Show system status

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agentrelay",
    about = "AgentRelay: event-triggered agent scheduling and workflow execution",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file and data directories
    Init,

    /// Run an agent's workflow
    Run {
        /// Agent id (directory name under the agents dir)
        agent: String,

        /// Print the workflow without executing it
        #[arg(long)]
        dry_run: bool,

        /// Run even if the agent is disabled
        #[arg(long)]
        force: bool,

        /// JSON object handed to the workflow as input
        #[arg(long)]
        input: Option<String>,

        /// Don't emit the completion event (no downstream triggers)
        #[arg(long)]
        no_emit: bool,
    },

    /// Emit an event
    Emit {
        /// Event type, e.g. `scout.completed`
        event_type: String,

        /// JSON object payload
        payload: Option<String>,
    },

    /// Dispatch the most urgent due invocations in today's backlog
    Process,

    /// Show recent events, newest first
    Events {
        /// Look-back window in hours
        #[arg(long)]
        hours: Option<u64>,
    },

    /// List installed agents
    Agents,

    /// Inspect skills
    Skills {
        #[command(subcommand)]
        action: Option<SkillsAction>,
    },

    /// Show system status
    Status,
}

#[derive(Subcommand)]
enum SkillsAction {
    /// List available skills
    List,

    /// Show one skill's metadata and document
    Show {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Run {
            agent,
            dry_run,
            force,
            input,
            no_emit,
        } => commands::run::run(&agent, dry_run, force, input.as_deref(), !no_emit).await?,
        Commands::Emit {
            event_type,
            payload,
        } => commands::emit::run(&event_type, payload.as_deref()).await?,
        Commands::Process => commands::process::run().await?,
        Commands::Events { hours } => commands::events::run(hours).await?,
        Commands::Agents => commands::agents::run().await?,
        Commands::Skills { action } => match action.unwrap_or(SkillsAction::List) {
            SkillsAction::List => commands::skills::list().await?,
            SkillsAction::Show { name } => commands::skills::show(&name).await?,
        },
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
