//! Error taxonomy for a single assistant turn

use thiserror::Error;

pub type Result<T, E = AssistantError> = std::result::Result<T, E>;

/// Every failure a turn can surface to the user.
///
/// All variants are recoverable: the orchestrator rolls the conversation back
/// and waits for the next input.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("No market data available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("Model requested an unknown function: {0}")]
    UnknownFunction(String),

    #[error("Arguments for {function} are not valid JSON: {source}")]
    MalformedArguments {
        function: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid arguments for {function}: {reason}")]
    InvalidArguments { function: String, reason: String },

    #[error("{service} is unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    #[error("Failed to render chart: {0}")]
    ChartRender(String),
}

impl AssistantError {
    pub fn data_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        AssistantError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_arguments(function: &str, reason: impl Into<String>) -> Self {
        AssistantError::InvalidArguments {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    pub fn service_unavailable(service: &str, reason: impl Into<String>) -> Self {
        AssistantError::ServiceUnavailable {
            service: service.to_string(),
            reason: reason.into(),
        }
    }
}
