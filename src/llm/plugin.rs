//! Prompt plugins stored on disk.
//!
//! A plugin is a directory of prompt functions:
//!
//! ```text
//! plugins-sk/
//!   CheckMetaData/          <- plugin
//!     FlowSensor/           <- function
//!       skprompt.txt        <- template, `{{$input}}` marks the input
//!       config.json         <- optional description and sampling settings
//! ```

use regex::{NoExpand, Regex};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{Result, UwoError};
use crate::llm::types::CompletionSettings;

/// Template file inside a function directory.
pub const PROMPT_FILE: &str = "skprompt.txt";

/// Optional settings file inside a function directory.
pub const CONFIG_FILE: &str = "config.json";

fn input_variable() -> &'static Regex {
    static INPUT: OnceLock<Regex> = OnceLock::new();
    INPUT.get_or_init(|| Regex::new(r"\{\{\s*\$input\s*\}\}").expect("valid input pattern"))
}

/// A prompt template that can be run by the kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptFunction {
    pub plugin_name: String,
    pub name: String,
    pub description: String,
    pub template: String,
    pub settings: CompletionSettings,
}

impl PromptFunction {
    /// Creates a function from an in-memory template.
    pub fn new(
        plugin_name: impl Into<String>,
        name: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            name: name.into(),
            description: String::new(),
            template: template.into(),
            settings: CompletionSettings::default(),
        }
    }

    /// Sets the sampling settings.
    pub fn with_settings(mut self, settings: CompletionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Loads a function from its directory.
    pub fn load(plugin_name: &str, directory: &Path) -> Result<Self> {
        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                UwoError::plugin_not_found(format!("Invalid function directory {}", directory.display()))
            })?;

        let prompt_path = directory.join(PROMPT_FILE);
        let template = std::fs::read_to_string(&prompt_path).map_err(|e| {
            UwoError::plugin_not_found(format!("Cannot read {}: {e}", prompt_path.display()))
        })?;

        let mut function = Self::new(plugin_name, name, template);

        let config_path = directory.join(CONFIG_FILE);
        if config_path.is_file() {
            let raw = std::fs::read_to_string(&config_path).map_err(|e| {
                UwoError::config(format!("Cannot read {}: {e}", config_path.display()))
            })?;
            let config: FunctionConfig = serde_json::from_str(&raw).map_err(|e| {
                UwoError::config(format!("Invalid prompt config {}: {e}", config_path.display()))
            })?;

            function.settings = config.settings();
            function.description = config.description.unwrap_or_default();
        }

        Ok(function)
    }

    /// Substitutes `input` for every `{{$input}}` in the template.
    pub fn render(&self, input: &str) -> String {
        input_variable()
            .replace_all(&self.template, NoExpand(input))
            .into_owned()
    }

    /// `Plugin.Function`, for log output.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.plugin_name, self.name)
    }
}

/// A named set of prompt functions.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPlugin {
    pub name: String,
    pub directory: PathBuf,
    functions: BTreeMap<String, PromptFunction>,
}

impl PromptPlugin {
    /// Loads `<parent>/<plugin_name>`. Subdirectories without a template
    /// are ignored.
    pub fn load_from_directory(parent: &Path, plugin_name: &str) -> Result<Self> {
        let directory = parent.join(plugin_name);
        if !directory.is_dir() {
            return Err(UwoError::plugin_not_found(format!(
                "Plugin directory {} does not exist",
                directory.display()
            )));
        }

        let entries = std::fs::read_dir(&directory).map_err(|e| {
            UwoError::plugin_not_found(format!("Cannot read {}: {e}", directory.display()))
        })?;

        let mut functions = BTreeMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() && path.join(PROMPT_FILE).is_file() {
                let function = PromptFunction::load(plugin_name, &path)?;
                debug!(function = %function.qualified_name(), "Loaded prompt function");
                functions.insert(function.name.clone(), function);
            }
        }

        Ok(Self {
            name: plugin_name.to_string(),
            directory,
            functions,
        })
    }

    /// Looks up a function by name.
    pub fn function(&self, name: &str) -> Result<&PromptFunction> {
        self.functions.get(name).ok_or_else(|| {
            UwoError::plugin_not_found(format!(
                "Function '{name}' not found in plugin '{}' ({})",
                self.name,
                self.directory.display()
            ))
        })
    }

    /// Names of all loaded functions, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

/// `config.json` of a prompt function.
///
/// Older plugins keep sampling settings under `completion`, newer ones under
/// `execution_settings.default`.
#[derive(Debug, Default, Deserialize)]
struct FunctionConfig {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completion: Option<CompletionSettings>,
    #[serde(default)]
    execution_settings: Option<HashMap<String, CompletionSettings>>,
}

impl FunctionConfig {
    fn settings(&self) -> CompletionSettings {
        if let Some(completion) = self.completion {
            return completion;
        }
        self.execution_settings
            .as_ref()
            .and_then(|all| all.get("default").or_else(|| all.values().next()))
            .copied()
            .unwrap_or_default()
    }
}
