//! Chat-completions client with legacy function calling
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::core::completion::{
    CompletionReply, CompletionRequest, CompletionService, FunctionCallMode,
};
use crate::core::config::ApiKey;
use crate::core::error::{AssistantError, Result};
use crate::core::message::{FunctionCall, Message};

const SERVICE: &str = "Completion service";

pub struct OpenAiCompletionService {
    client: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
    model: String,
}

impl OpenAiCompletionService {
    pub fn new(base_url: &str, api_key: ApiKey, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AssistantError::service_unavailable(SERVICE, e.to_string()))?;

        Ok(OpenAiCompletionService {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'static str>,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, request: &CompletionRequest<'a>) -> Self {
        let offer_functions =
            request.mode == FunctionCallMode::Auto && !request.functions.is_empty();
        ChatRequest {
            model,
            messages: request.messages,
            functions: offer_functions
                .then(|| request.functions.iter().map(|f| f.to_schema()).collect()),
            function_call: offer_functions.then_some("auto"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl CompletionService for OpenAiCompletionService {
    #[instrument(
        name = "ChatCompletion",
        skip_all,
        fields(messages = request.messages.len(), mode = ?request.mode)
    )]
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<CompletionReply> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest::new(&self.model, &request);
        debug!(model = %self.model, "Requesting completion from {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("Request error: {e}")
                };
                AssistantError::service_unavailable(SERVICE, reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            error!(%status, "Completion service error response: {}", detail);
            return Err(AssistantError::service_unavailable(
                SERVICE,
                format!("HTTP error: {status}: {detail}"),
            ));
        }

        let data: ChatResponse = response.json().await.map_err(|e| {
            AssistantError::service_unavailable(SERVICE, format!("Failed to parse response: {e}"))
        })?;

        let choice = data.choices.into_iter().next().ok_or_else(|| {
            AssistantError::service_unavailable(SERVICE, "response contained no choices")
        })?;
        debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            has_function_call = choice.message.function_call.is_some(),
            "Received completion"
        );

        Ok(CompletionReply {
            content: choice.message.content,
            function_call: choice.message.function_call,
        })
    }
}
