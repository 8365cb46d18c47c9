use super::{history, ui};
use crate::core::{AssistantError, Orchestrator, Session, TurnReply};
use anyhow::Result;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// A turn that failed after its error was already printed. Callers only need
/// the exit status.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct TurnFailed(#[from] pub AssistantError);

/// Commands understood by the REPL in place of a question.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Quit,
    Reset,
    History,
    Ask(&'a str),
    Empty,
}

fn parse_line(line: &str) -> ReplCommand<'_> {
    match line.trim() {
        "" => ReplCommand::Empty,
        "/quit" | "/exit" => ReplCommand::Quit,
        "/reset" => ReplCommand::Reset,
        "/history" => ReplCommand::History,
        input => ReplCommand::Ask(input),
    }
}

/// Formats the end of a turn for the terminal.
pub fn render_reply(reply: &TurnReply) -> String {
    match reply {
        TurnReply::Text(text) => ui::style_text(text, ui::StyleType::Assistant),
        TurnReply::Chart(artifact) => format!(
            "Chart for {} saved to {}",
            artifact.ticker,
            ui::style_text(&artifact.path.display().to_string(), ui::StyleType::Title)
        ),
    }
}

pub fn render_error(err: &AssistantError) -> String {
    ui::style_text(&format!("Error occurred: {err}"), ui::StyleType::Error)
}

/// Saves the session, keeping the REPL alive when the write fails.
fn persist(session: &Session, session_path: &Path) -> bool {
    match session.save(session_path) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Failed to save session");
            println!(
                "{}",
                ui::style_text(
                    &format!("Could not save the conversation: {e}"),
                    ui::StyleType::Error
                )
            );
            false
        }
    }
}

async fn run_turn(
    orchestrator: &Orchestrator,
    session: &mut Session,
    input: &str,
) -> Result<TurnReply, AssistantError> {
    let pb = ui::new_spinner("Thinking...");
    let result = orchestrator.handle_input(session, input).await;
    pb.finish_and_clear();
    result
}

/// Interactive session. The conversation is saved after every turn so a
/// restart picks up where it left off.
pub async fn run(orchestrator: &Orchestrator, session_path: &Path, fresh: bool) -> Result<()> {
    let mut session = if fresh {
        Session::new()
    } else {
        Session::load_or_new(session_path)
    };
    info!(
        messages = session.conversation.len(),
        "Starting chat session"
    );

    println!(
        "{}",
        ui::style_text("Stock Analysis Assistant", ui::StyleType::Title)
    );
    println!(
        "{}",
        ui::style_text(
            "Ask about prices, SMA, EMA, RSI, MACD or request a chart. /history, /reset, /quit",
            ui::StyleType::Subtle
        )
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ui::style_text("Input:", ui::StyleType::Prompt));
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Reset => {
                session.reset();
                persist(&session, session_path);
                println!("{}", ui::style_text("Conversation cleared.", ui::StyleType::Subtle));
            }
            ReplCommand::History => {
                println!("{}", history::display_as_table(&session.conversation));
            }
            ReplCommand::Ask(input) => {
                match run_turn(orchestrator, &mut session, input).await {
                    Ok(reply) => println!("{}", render_reply(&reply)),
                    Err(e) => println!("{}", render_error(&e)),
                }
                persist(&session, session_path);
                ui::print_separator();
            }
        }
    }

    debug!("Chat session ended");
    Ok(())
}

/// Single question against the saved session.
pub async fn ask(orchestrator: &Orchestrator, session_path: &Path, question: &str) -> Result<()> {
    let mut session = Session::load_or_new(session_path);
    let result = run_turn(orchestrator, &mut session, question).await;
    session.save(session_path)?;

    match result {
        Ok(reply) => {
            println!("{}", render_reply(&reply));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", render_error(&e));
            Err(TurnFailed(e).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chart::ChartArtifact;
    use std::path::PathBuf;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), ReplCommand::Empty);
        assert_eq!(parse_line("/quit"), ReplCommand::Quit);
        assert_eq!(parse_line("/exit\n"), ReplCommand::Quit);
        assert_eq!(parse_line("/reset"), ReplCommand::Reset);
        assert_eq!(parse_line("/history"), ReplCommand::History);
        assert_eq!(
            parse_line("  What is Apple's stock price? "),
            ReplCommand::Ask("What is Apple's stock price?")
        );
    }

    #[test]
    fn test_persist_reports_failure_without_erroring() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let mut session = Session::new();
        session.conversation.push_user("hi");
        assert!(!persist(&session, &blocker.join("session.json")));

        let path = dir.path().join("session.json");
        assert!(persist(&session, &path));
        assert_eq!(Session::load(&path).unwrap().conversation.len(), 1);
    }

    #[test]
    fn test_turn_failed_keeps_message() {
        let err: anyhow::Error =
            TurnFailed(AssistantError::data_unavailable("XYZ", "symbol not found")).into();
        assert!(err.is::<TurnFailed>());
        assert_eq!(err.to_string(), "No market data available for XYZ: symbol not found");
    }

    #[test]
    fn test_render_reply() {
        let text = render_reply(&TurnReply::Text("RSI is 55.".to_string()));
        assert!(text.contains("RSI is 55."));

        let chart = render_reply(&TurnReply::Chart(ChartArtifact {
            ticker: "TSLA".to_string(),
            path: PathBuf::from("stock.svg"),
        }));
        assert!(chart.contains("Chart for TSLA saved to"));
        assert!(chart.contains("stock.svg"));

        let err = render_error(&AssistantError::UnknownFunction("buy".to_string()));
        assert!(err.contains("Error occurred: Model requested an unknown function: buy"));
    }
}
