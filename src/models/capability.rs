//! Editor features requested from every connected language server

use serde::{Deserialize, Serialize};

/// Fixed feature set shared read-only by all connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityOptions {
    #[serde(default = "defaults::enabled")]
    pub hover: bool,

    #[serde(default = "defaults::enabled")]
    pub document_highlights: bool,

    #[serde(default)]
    pub completion: CompletionOptions,
}

impl Default for CapabilityOptions {
    fn default() -> Self {
        Self {
            hover: true,
            document_highlights: true,
            completion: CompletionOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOptions {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Replace the editor's built-in completers instead of merging with them
    #[serde(default = "defaults::enabled")]
    pub overwrite_completers: bool,

    #[serde(default)]
    pub trigger_characters: TriggerCharacters,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            overwrite_completers: true,
            trigger_characters: TriggerCharacters::default(),
        }
    }
}

/// Adjustments to the trigger characters each server advertises
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCharacters {
    #[serde(default = "defaults::trigger_add")]
    pub add: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

impl Default for TriggerCharacters {
    fn default() -> Self {
        Self {
            add: defaults::trigger_add(),
            remove: Vec::new(),
        }
    }
}

mod defaults {
    pub fn enabled() -> bool {
        true
    }
    pub fn trigger_add() -> Vec<String> {
        vec![".".to_string()]
    }
}

impl CapabilityOptions {
    /// Feature block in the shape the editor's language client consumes
    pub fn functionality(&self) -> serde_json::Value {
        let completion = if self.completion.enabled {
            let mut triggers = serde_json::json!({ "add": self.completion.trigger_characters.add });
            if !self.completion.trigger_characters.remove.is_empty() {
                triggers["remove"] = serde_json::json!(self.completion.trigger_characters.remove);
            }
            serde_json::json!({
                "overwriteCompleters": self.completion.overwrite_completers,
                "lspCompleterOptions": { "triggerCharacters": triggers },
            })
        } else {
            serde_json::Value::Bool(false)
        };

        serde_json::json!({
            "functionality": {
                "hover": self.hover,
                "completion": completion,
                "documentHighlights": self.document_highlights,
            }
        })
    }
}
