//! Execution context for prompt functions.
//!
//! A kernel owns exactly one completion service and the plugins imported
//! into it. Kernels are cheap and built per call; nothing is shared between
//! them.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::llm::factory::create_client;
use crate::llm::plugin::{PromptFunction, PromptPlugin};
use crate::llm::types::Message;
use crate::llm::{LlmClient, LlmProvider};

/// Runs prompt functions against one completion service.
pub struct Kernel {
    service: Box<dyn LlmClient>,
    plugins: HashMap<String, PromptPlugin>,
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("service", &self.service.name())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Kernel {
    /// Builds a kernel with the completion service selected by `config`.
    ///
    /// Fails with a backend configuration error when the service's
    /// credentials are missing.
    pub fn configure(config: &ClassifierConfig) -> Result<Self> {
        match LlmProvider::from_config(config) {
            LlmProvider::AzureOpenAi => {
                info!("Configuring kernel with Azure OpenAI chat completion service.")
            }
            LlmProvider::OpenAi => {
                info!("Azure OpenAI not configured. Configuring kernel with OpenAI chat completion service.")
            }
        }
        Ok(Self::with_service(create_client(config)?))
    }

    /// Builds a kernel around an existing completion service.
    pub fn with_service(service: Box<dyn LlmClient>) -> Self {
        Self {
            service,
            plugins: HashMap::new(),
        }
    }

    /// Name of the attached completion service.
    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Imports `<directory>/<plugin_name>` and returns it.
    pub fn import_plugin_from_directory(
        &mut self,
        directory: &Path,
        plugin_name: &str,
    ) -> Result<&PromptPlugin> {
        let plugin = PromptPlugin::load_from_directory(directory, plugin_name)?;
        debug!(
            plugin = plugin_name,
            functions = ?plugin.function_names(),
            "Imported plugin"
        );
        Ok(match self.plugins.entry(plugin_name.to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(plugin);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(plugin),
        })
    }

    /// A previously imported plugin.
    pub fn plugin(&self, name: &str) -> Option<&PromptPlugin> {
        self.plugins.get(name)
    }

    /// Renders `function` with `input` and awaits the service's reply.
    pub async fn run(&self, function: &PromptFunction, input: &str) -> Result<String> {
        let messages = [Message::user(function.render(input))];
        debug!(
            function = %function.qualified_name(),
            service = self.service.name(),
            "Invoking prompt function"
        );
        self.service.complete(&messages, &function.settings).await
    }
}
