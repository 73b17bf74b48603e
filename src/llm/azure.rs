//! Azure OpenAI chat completion client.
//!
//! Talks to a model deployment on an Azure OpenAI resource. The deployment,
//! not the request body, selects the model.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Result, UwoError};
use crate::llm::openai::{build_http_client, read_completion, request_error, ChatRequest};
use crate::llm::types::{CompletionSettings, Message};
use crate::llm::LlmClient;

/// Environment variable holding the deployment name.
pub const AZURE_DEPLOYMENT_VAR: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";

/// Environment variable holding the API key.
pub const AZURE_API_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";

/// Environment variable holding the resource endpoint.
pub const AZURE_ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";

/// Azure OpenAI client configuration.
#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    /// Model deployment name.
    pub deployment: String,
    /// API key for the resource.
    pub api_key: String,
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com/`.
    pub endpoint: String,
    /// REST API version.
    pub api_version: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl AzureOpenAiConfig {
    /// Creates a new config.
    pub fn new(
        deployment: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            deployment: deployment.into(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_version: api_version.into(),
            timeout_secs: 60,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Reads deployment, key and endpoint through `lookup`.
    ///
    /// Every missing variable is named in the backend configuration error.
    pub fn from_vars<F>(lookup: F, api_version: impl Into<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let deployment = present(AZURE_DEPLOYMENT_VAR);
        let api_key = present(AZURE_API_KEY_VAR);
        let endpoint = present(AZURE_ENDPOINT_VAR);

        match (deployment, api_key, endpoint) {
            (Some(deployment), Some(api_key), Some(endpoint)) => {
                Ok(Self::new(deployment, api_key, endpoint, api_version))
            }
            (deployment, api_key, endpoint) => {
                let missing: Vec<&str> = [
                    (AZURE_DEPLOYMENT_VAR, deployment.is_none()),
                    (AZURE_API_KEY_VAR, api_key.is_none()),
                    (AZURE_ENDPOINT_VAR, endpoint.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();

                Err(UwoError::backend_configuration(format!(
                    "Azure OpenAI settings missing: {}. Add them to the environment or the .env file.",
                    missing.join(", ")
                )))
            }
        }
    }

    /// Chat completions URL of the deployment.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

/// Azure OpenAI LLM client.
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    config: AzureOpenAiConfig,
    client: Client,
}

impl AzureOpenAiClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: AzureOpenAiConfig) -> Result<Self> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmClient for AzureOpenAiClient {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn complete(&self, messages: &[Message], settings: &CompletionSettings) -> Result<String> {
        let request = ChatRequest::new(None, messages, settings);
        debug!(
            deployment = %self.config.deployment,
            messages = messages.len(),
            "Azure OpenAI chat completion"
        );

        let response = self
            .client
            .post(self.config.completions_url())
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("Azure OpenAI", e))?;

        read_completion("Azure OpenAI", response).await
    }
}
