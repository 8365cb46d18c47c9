//! Function-calling dialogue loop
//!
//! One user input runs through an explicit state machine:
//!
//! ```text
//! ModelDeciding -> DirectReply --------------------------> Complete
//!               -> FunctionDispatch -> FollowupModelCall -> Complete
//!                                   (chart) -------------> Complete
//! ```
//!
//! A failure in any state rolls the conversation back to the point right
//! after the user's message was appended.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::core::chart::ChartArtifact;
use crate::core::completion::{
    CompletionReply, CompletionRequest, CompletionService, FunctionCallMode,
};
use crate::core::error::{AssistantError, Result};
use crate::core::message::{Conversation, FunctionCall, Message};
use crate::core::registry::{self, FunctionSpec};
use crate::core::session::Session;
use crate::core::toolkit::{FunctionOutput, StockToolkit};

/// What the presentation layer shows at the end of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnReply {
    Text(String),
    Chart(ChartArtifact),
}

#[derive(Debug)]
enum TurnState {
    ModelDeciding,
    DirectReply(String),
    FunctionDispatch(FunctionCall),
    FollowupModelCall,
    Complete(TurnReply),
}

pub struct Orchestrator {
    completion: Arc<dyn CompletionService>,
    toolkit: StockToolkit,
    functions: Vec<FunctionSpec>,
    system_prompt: Option<String>,
}

impl Orchestrator {
    pub fn new(completion: Arc<dyn CompletionService>, toolkit: StockToolkit) -> Self {
        Orchestrator {
            completion,
            toolkit,
            functions: registry::list_specs(),
            system_prompt: None,
        }
    }

    /// Instruction sent ahead of the conversation on every request. It is
    /// not stored in the session.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    /// Processes one user input to completion.
    ///
    /// On error the user's message stays in the session but nothing recorded
    /// after it survives.
    #[instrument(name = "Turn", skip_all)]
    pub async fn handle_input(&self, session: &mut Session, input: &str) -> Result<TurnReply> {
        let conversation = &mut session.conversation;
        conversation.push_user(input);
        let checkpoint = conversation.len();

        let result = self.run_turn(conversation).await;
        if let Err(e) = &result {
            warn!(error = %e, "Turn failed, rolling back");
            conversation.truncate(checkpoint);
        }
        result
    }

    async fn run_turn(&self, conversation: &mut Conversation) -> Result<TurnReply> {
        let mut state = TurnState::ModelDeciding;
        loop {
            debug!(?state, "Turn state");
            state = match state {
                TurnState::ModelDeciding => {
                    let reply = self.complete(conversation, FunctionCallMode::Auto).await?;
                    match reply {
                        CompletionReply {
                            function_call: Some(call),
                            ..
                        } => TurnState::FunctionDispatch(call),
                        CompletionReply {
                            content: Some(text),
                            ..
                        } => TurnState::DirectReply(text),
                        _ => return Err(empty_reply()),
                    }
                }
                TurnState::DirectReply(text) => {
                    conversation.push_assistant(&text);
                    TurnState::Complete(TurnReply::Text(text))
                }
                TurnState::FunctionDispatch(call) => {
                    let invocation = registry::parse_call(&call)?;
                    info!(function = %invocation.function(), "Dispatching function call");
                    match self.toolkit.invoke(&invocation).await? {
                        FunctionOutput::Chart(artifact) => {
                            TurnState::Complete(TurnReply::Chart(artifact))
                        }
                        FunctionOutput::Text(result) => {
                            conversation.push_function_exchange(call, result);
                            TurnState::FollowupModelCall
                        }
                    }
                }
                TurnState::FollowupModelCall => {
                    let reply = self.complete(conversation, FunctionCallMode::Disabled).await?;
                    let text = reply.content.ok_or_else(empty_reply)?;
                    conversation.push_assistant(&text);
                    TurnState::Complete(TurnReply::Text(text))
                }
                TurnState::Complete(reply) => return Ok(reply),
            };
        }
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        mode: FunctionCallMode,
    ) -> Result<CompletionReply> {
        let functions: &[FunctionSpec] = match mode {
            FunctionCallMode::Auto => &self.functions,
            FunctionCallMode::Disabled => &[],
        };

        match &self.system_prompt {
            Some(prompt) => {
                let mut messages = Vec::with_capacity(conversation.len() + 1);
                messages.push(Message::system(prompt));
                messages.extend_from_slice(conversation.messages());
                self.completion
                    .complete(CompletionRequest {
                        messages: &messages,
                        functions,
                        mode,
                    })
                    .await
            }
            None => {
                self.completion
                    .complete(CompletionRequest {
                        messages: conversation.messages(),
                        functions,
                        mode,
                    })
                    .await
            }
        }
    }
}

fn empty_reply() -> AssistantError {
    AssistantError::service_unavailable(
        "Completion service",
        "reply contained neither text nor a function call",
    )
}
