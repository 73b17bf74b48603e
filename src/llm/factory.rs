//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating completion clients.

use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::llm::{
    AzureOpenAiClient, AzureOpenAiConfig, LlmClient, LlmProvider, OpenAiClient, OpenAiConfig,
};

/// Creates the completion client selected by `config`, reading credentials
/// from the process environment.
///
/// - Azure OpenAI: `AZURE_OPENAI_DEPLOYMENT_NAME`, `AZURE_OPENAI_API_KEY`,
///   `AZURE_OPENAI_ENDPOINT`
/// - OpenAI: `OPENAI_API_KEY`, optionally `OPENAI_ORG_ID`
pub fn create_client(config: &ClassifierConfig) -> Result<Box<dyn LlmClient>> {
    create_client_with(config, |name| std::env::var(name).ok())
}

/// Same as [`create_client`] but resolves credentials through `lookup`.
pub fn create_client_with<F>(config: &ClassifierConfig, lookup: F) -> Result<Box<dyn LlmClient>>
where
    F: Fn(&str) -> Option<String>,
{
    match LlmProvider::from_config(config) {
        LlmProvider::AzureOpenAi => {
            let azure = AzureOpenAiConfig::from_vars(lookup, config.azure_api_version.clone())?
                .with_timeout(config.timeout_secs);
            Ok(Box::new(AzureOpenAiClient::new(azure)?))
        }
        LlmProvider::OpenAi => {
            let openai = OpenAiConfig::from_vars(lookup, config.openai_model.clone())?
                .with_timeout(config.timeout_secs);
            Ok(Box::new(OpenAiClient::new(openai)?))
        }
    }
}
