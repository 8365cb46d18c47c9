use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::process::ExitCode;
use stockchat::cli::chat::TurnFailed;
use stockchat::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for stockchat::AppCommand {
    fn from(cmd: Commands) -> stockchat::AppCommand {
        match cmd {
            Commands::Chat { fresh } => stockchat::AppCommand::Chat { fresh },
            Commands::Ask { question } => stockchat::AppCommand::Ask {
                question: question.join(" "),
            },
            Commands::History => stockchat::AppCommand::History,
            Commands::Reset => stockchat::AppCommand::Reset,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Start an interactive conversation
    Chat {
        /// Ignore the saved conversation and start over
        #[arg(long)]
        fresh: bool,
    },
    /// Ask a single question, continuing the saved conversation
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Show the saved conversation
    History,
    /// Delete the saved conversation
    Reset,
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Setup) => stockchat::cli::setup::setup(),
        Some(cmd) => stockchat::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        // Already shown to the user by the chat layer.
        Err(e) if e.is::<TurnFailed>() => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
