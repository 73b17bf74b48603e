//! Flow sensor metadata classification.
//!
//! Sends a metadata comment through the `CheckMetaData/FlowSensor` prompt
//! function and reads the model's JSON verdict. A reply that is not a JSON
//! object never fails the call; it becomes the fallback decision.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::llm::Kernel;

/// Plugin holding the metadata checks.
pub const CHECK_META_DATA_PLUGIN: &str = "CheckMetaData";

/// Prompt function that judges flow sensor comments.
pub const FLOW_SENSOR_FUNCTION: &str = "FlowSensor";

/// `answer` of the fallback decision.
pub const FALLBACK_ANSWER: &str = "error";

/// `comment` of the fallback decision.
pub const FALLBACK_COMMENT: &str = "Could not convert to json.";

/// The model's verdict on one metadata comment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDecision {
    /// Category chosen by the model.
    #[serde(default)]
    pub answer: String,

    /// The model's explanation.
    #[serde(default)]
    pub comment: String,

    /// Any further keys of the reply, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ClassificationDecision {
    /// Creates a decision without extra keys.
    pub fn new(answer: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            comment: comment.into(),
            extra: Map::new(),
        }
    }

    /// `{"answer": "error", "comment": "Could not convert to json."}`
    pub fn fallback() -> Self {
        Self::new(FALLBACK_ANSWER, FALLBACK_COMMENT)
    }

    /// Returns true for the fallback decision.
    pub fn is_fallback(&self) -> bool {
        self == &Self::fallback()
    }
}

/// Reads a model reply as a decision.
///
/// Non-string `answer`/`comment` values are kept as their JSON text. Any
/// reply that is not a JSON object is logged and replaced by
/// [`ClassificationDecision::fallback`].
pub fn parse_decision(raw: &str) -> ClassificationDecision {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(mut map)) => {
            let answer = map.remove("answer").map(json_text).unwrap_or_default();
            let comment = map.remove("comment").map(json_text).unwrap_or_default();
            ClassificationDecision {
                answer,
                comment,
                extra: map,
            }
        }
        _ => {
            warn!("Could not convert \"{raw}\" to json.");
            ClassificationDecision::fallback()
        }
    }
}

fn json_text(value: JsonValue) -> String {
    match value {
        JsonValue::String(text) => text,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Classifies one flow sensor metadata comment.
///
/// Builds a fresh kernel from `config`, loads `CheckMetaData/FlowSensor`
/// from the configured plugin directory and runs it. Missing credentials
/// and missing plugins are errors; an unreadable reply is not.
pub async fn classify_flow_sensor_metadata(
    config: &ClassifierConfig,
    comment: &str,
) -> Result<ClassificationDecision> {
    let mut kernel = Kernel::configure(config)?;
    classify_with_kernel(&mut kernel, &config.plugins_directory, comment).await
}

/// Same as [`classify_flow_sensor_metadata`] on a caller-supplied kernel.
pub async fn classify_with_kernel(
    kernel: &mut Kernel,
    plugins_directory: &Path,
    comment: &str,
) -> Result<ClassificationDecision> {
    let function = kernel
        .import_plugin_from_directory(plugins_directory, CHECK_META_DATA_PLUGIN)?
        .function(FLOW_SENSOR_FUNCTION)?
        .clone();

    let reply = kernel.run(&function, comment).await?;
    debug!(reply = %reply, "Flow sensor classification reply");

    Ok(parse_decision(&reply))
}
