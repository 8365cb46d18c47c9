//! Stock market assistant combining a function-calling chat model with
//! deterministic price indicators.

pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::orchestrator::Orchestrator;
use crate::core::session::Session;
use crate::core::toolkit::StockToolkit;
use crate::providers::openai::OpenAiCompletionService;
use crate::providers::yahoo_finance::YahooFinanceProvider;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Chat { fresh: bool },
    Ask { question: String },
    History,
    Reset,
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Wires the configured providers into an orchestrator. The API key is read
/// once here.
pub fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let openai = config.openai();
    let api_key = config.api_key()?;
    let completion = OpenAiCompletionService::new(
        &openai.base_url,
        api_key,
        &config.model,
        Duration::from_secs(openai.timeout_secs),
    )?;
    let market = YahooFinanceProvider::new(config.yahoo_base_url())?;
    let toolkit = StockToolkit::new(Arc::new(market), &config.chart_path);

    Ok(Orchestrator::new(Arc::new(completion), toolkit)
        .with_system_prompt(config.system_prompt.clone()))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Stock assistant starting...");
    let config = load_config(config_path)?;
    let session_path = config.session_path()?;

    match command {
        AppCommand::Chat { fresh } => {
            let orchestrator = build_orchestrator(&config)?;
            cli::chat::run(&orchestrator, &session_path, fresh).await
        }
        AppCommand::Ask { question } => {
            let orchestrator = build_orchestrator(&config)?;
            cli::chat::ask(&orchestrator, &session_path, &question).await
        }
        AppCommand::History => {
            let session = Session::load_or_new(&session_path);
            println!("{}", cli::history::display_as_table(&session.conversation));
            Ok(())
        }
        AppCommand::Reset => {
            if Session::remove(&session_path)? {
                println!("Cleared saved session at {}", session_path.display());
            } else {
                println!("No saved session to clear");
            }
            Ok(())
        }
    }
}
