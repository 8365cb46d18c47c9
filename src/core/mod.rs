//! Core dialogue logic and abstractions

pub mod chart;
pub mod completion;
pub mod config;
pub mod error;
pub mod indicators;
pub mod log;
pub mod market;
pub mod message;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod toolkit;

// Re-export main types for cleaner imports
pub use completion::{CompletionService, FunctionCallMode};
pub use error::AssistantError;
pub use market::{MarketDataProvider, PriceSeries};
pub use message::{Conversation, Message, Role};
pub use orchestrator::{Orchestrator, TurnReply};
pub use session::Session;
