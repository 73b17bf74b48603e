//! OpenAI chat completion client.
//!
//! Implements the LlmClient trait for the directly hosted OpenAI API. The
//! request and response envelopes defined here are shared with the Azure
//! OpenAI client, which speaks the same chat completions format.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, UwoError};
use crate::llm::types::{CompletionSettings, Message};
use crate::llm::LlmClient;

/// OpenAI API base URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Environment variable holding the API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding the optional organization id.
pub const OPENAI_ORG_ID_VAR: &str = "OPENAI_ORG_ID";

/// OpenAI client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Organization id sent as `OpenAI-Organization`.
    pub org_id: Option<String>,
    /// Model to use (e.g., "gpt-3.5-turbo-1106").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            org_id: None,
            model: model.into(),
            timeout_secs: 60,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Reads the API key and organization id through `lookup`.
    ///
    /// Fails with a backend configuration error when the key is missing.
    pub fn from_vars<F>(lookup: F, model: impl Into<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = present(OPENAI_API_KEY_VAR).ok_or_else(|| {
            UwoError::backend_configuration(format!(
                "{OPENAI_API_KEY_VAR} is not set. Add it to the environment or the .env file."
            ))
        })?;

        let mut config = Self::new(api_key, model);
        config.org_id = present(OPENAI_ORG_ID_VAR);
        Ok(config)
    }
}

/// OpenAI LLM client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    /// Creates a new OpenAI client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, messages: &[Message], settings: &CompletionSettings) -> Result<String> {
        let request = ChatRequest::new(Some(&self.config.model), messages, settings);
        debug!(model = %self.config.model, messages = messages.len(), "OpenAI chat completion");

        let mut builder = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.config.api_key)
            .json(&request);

        if let Some(org_id) = &self.config.org_id {
            builder = builder.header("OpenAI-Organization", org_id);
        }

        let response = builder.send().await.map_err(|e| request_error("OpenAI", e))?;
        read_completion("OpenAI", response).await
    }
}

/// Builds the HTTP client shared by the chat completion clients.
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| UwoError::llm(format!("Failed to create HTTP client: {e}")))
}

/// Maps a transport failure to an LLM error.
pub(crate) fn request_error(service: &str, error: reqwest::Error) -> UwoError {
    if error.is_timeout() {
        UwoError::llm(format!("{service} request timed out."))
    } else if error.is_connect() {
        UwoError::llm(format!("Failed to connect to {service}. Check your network."))
    } else {
        UwoError::llm(format!("{service} request failed: {error}"))
    }
}

/// Reads a chat completion response and returns the first choice's text.
pub(crate) async fn read_completion(service: &str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| UwoError::llm(format!("Failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(parse_error(service, status, &body));
    }

    parse_completion(service, &body)
}

/// Extracts the first choice's content from a successful response body.
pub(crate) fn parse_completion(service: &str, body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| UwoError::llm(format!("Failed to parse {service} response: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| UwoError::llm(format!("No response from {service}")))
}

/// Turns an error status and body into an LLM error.
pub(crate) fn parse_error(service: &str, status: reqwest::StatusCode, body: &str) -> UwoError {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return UwoError::llm(format!("{service} authentication failed. Check the API key."));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return UwoError::llm(format!("{service} rate limit reached."));
    }

    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        return UwoError::llm(format!(
            "{service} API error: {}",
            error_response.error.message
        ));
    }

    UwoError::llm(format!("{service} API error ({status}): {body}"))
}

// Chat completions wire types

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
    #[serde(flatten)]
    settings: CompletionSettings,
}

impl<'a> ChatRequest<'a> {
    pub(crate) fn new(
        model: Option<&'a str>,
        messages: &'a [Message],
        settings: &CompletionSettings,
    ) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            settings: *settings,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
