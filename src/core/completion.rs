//! Language-model completion abstractions

use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::message::{FunctionCall, Message};
use crate::core::registry::FunctionSpec;

/// Whether the model may answer with a function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCallMode {
    /// The model decides between free text and one of the offered functions.
    Auto,
    /// No functions are offered.
    Disabled,
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub functions: &'a [FunctionSpec],
    pub mode: FunctionCallMode,
}

/// The assistant's reply to a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionReply {
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<CompletionReply>;
}
