//! Mock LLM client for testing.
//!
//! Returns a fixed reply (or a fixed error) and records every prompt it
//! receives.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{Result, UwoError};
use crate::llm::types::{CompletionSettings, Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that answers every request with the same text.
///
/// Used for unit testing without making real API calls.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    reply: String,
    error: Option<String>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    settings: Arc<Mutex<Vec<CompletionSettings>>>,
}

impl MockLlmClient {
    /// Creates a mock that replies with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    /// Creates a mock whose requests fail with an LLM error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The last user message of every request, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|messages| {
                messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.clone())
            })
            .collect()
    }

    /// Sampling settings of every request, oldest first.
    pub fn settings(&self) -> Vec<CompletionSettings> {
        self.settings.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message], settings: &CompletionSettings) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        if let Ok(mut recorded) = self.settings.lock() {
            recorded.push(*settings);
        }

        match &self.error {
            Some(message) => Err(UwoError::llm(message.clone())),
            None => Ok(self.reply.clone()),
        }
    }
}
