//! Explicit per-user session context

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::message::Conversation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub started_at: DateTime<Utc>,
    pub conversation: Conversation,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            started_at: Utc::now(),
            conversation: Conversation::new(),
        }
    }

    /// Starts over with an empty conversation.
    pub fn reset(&mut self) {
        *self = Session::new();
    }

    /// Reloads a saved session. A missing file yields a new session; a file
    /// that cannot be parsed or holds an inconsistent conversation is
    /// discarded.
    pub fn load_or_new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No saved session at {}", path.display());
            return Session::new();
        }

        match Self::load(path) {
            Ok(session) => {
                debug!(
                    messages = session.conversation.len(),
                    "Restored session from {}",
                    path.display()
                );
                session
            }
            Err(e) => {
                warn!("Discarding saved session at {}: {e:#}", path.display());
                Session::new()
            }
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write session file: {}", path.display()))?;
        debug!("Saved session to {}", path.display());
        Ok(())
    }

    /// Deletes a saved session, returning whether one existed.
    pub fn remove<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove session file: {}", path.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::FunctionCall;
    use tempfile::TempDir;

    fn sample() -> Session {
        let mut session = Session::new();
        session.conversation.push_user("What is the RSI of TSLA?");
        session.conversation.push_function_exchange(
            FunctionCall {
                name: "calculate_rsi".to_string(),
                arguments: r#"{"ticker":"TSLA"}"#.to_string(),
            },
            "61.2".to_string(),
        );
        session.conversation.push_assistant("TSLA's RSI is 61.2.");
        session
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("session.json");
        let session = sample();

        session.save(&path)?;
        let reloaded = Session::load(&path)?;
        assert_eq!(reloaded, session);
        assert_eq!(reloaded.conversation.messages(), session.conversation.messages());
        Ok(())
    }

    #[test]
    fn test_missing_or_corrupt_file_starts_fresh() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("session.json");
        assert!(Session::load_or_new(&path).conversation.is_empty());

        fs::write(&path, "{ not json")?;
        assert!(Session::load_or_new(&path).conversation.is_empty());

        let orphan = r#"{
            "started_at": "2024-05-01T10:00:00Z",
            "conversation": [
                {"role": "user", "content": "price?"},
                {"role": "assistant", "content": null,
                 "function_call": {"name": "get_stock_price", "arguments": "{}"}}
            ]
        }"#;
        fs::write(&path, orphan)?;
        assert!(Session::load_or_new(&path).conversation.is_empty());
        Ok(())
    }

    #[test]
    fn test_reset_and_remove() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("session.json");
        let mut session = sample();
        session.save(&path)?;

        session.reset();
        assert!(session.conversation.is_empty());

        assert!(Session::remove(&path)?);
        assert!(!Session::remove(&path)?);
        Ok(())
    }
}
