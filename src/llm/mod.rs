//! LLM integration for the metadata classifier.
//!
//! Provides the completion client trait, the Azure OpenAI and OpenAI
//! clients, prompt plugins loaded from disk, and the kernel that runs them.

pub mod azure;
pub mod factory;
pub mod kernel;
pub mod mock;
pub mod openai;
pub mod plugin;
pub mod types;

pub use azure::{AzureOpenAiClient, AzureOpenAiConfig};
pub use factory::{create_client, create_client_with};
pub use kernel::Kernel;
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use plugin::{PromptFunction, PromptPlugin};
pub use types::{CompletionSettings, Message, Role};

use async_trait::async_trait;

use crate::config::ClassifierConfig;
use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short service name for log output.
    fn name(&self) -> &str;

    /// Generates a completion for the given messages.
    ///
    /// Returns the complete response as a single string. No retries.
    async fn complete(&self, messages: &[Message], settings: &CompletionSettings) -> Result<String>;
}

/// Completion service provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// Model deployment on an Azure OpenAI resource.
    AzureOpenAi,
    /// The directly hosted OpenAI API.
    OpenAi,
}

impl LlmProvider {
    /// The provider selected by the classifier configuration.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        if config.use_azure_openai {
            Self::AzureOpenAi
        } else {
            Self::OpenAi
        }
    }

    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AzureOpenAi => "azure-openai",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
