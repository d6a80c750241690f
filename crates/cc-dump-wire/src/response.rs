use serde::{Deserialize, Serialize};

use crate::content::ContentBlock;
use crate::unknown_fields::UnknownFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u32>,
}

impl Usage {
    /// Merges a later-arriving `message_delta` usage object into this one,
    /// the way the recorder consolidates `message_start` and `message_delta`
    /// usage fields into a single canonical figure.
    pub fn merge(&mut self, other: &Usage) {
        if other.output_tokens != 0 {
            self.output_tokens = other.output_tokens;
        }
        if other.input_tokens != 0 {
            self.input_tokens = other.input_tokens;
        }
        if other.cache_creation_input_tokens.is_some() {
            self.cache_creation_input_tokens = other.cache_creation_input_tokens;
        }
        if other.cache_read_input_tokens.is_some() {
            self.cache_read_input_tokens = other.cache_read_input_tokens;
        }
    }
}

/// A complete (non-streaming-shaped) assistant message, either received
/// directly from a non-streaming upstream call or reconstructed by the
/// recorder from accumulated streaming deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
    pub usage: Usage,
    #[serde(flatten)]
    pub unknown_fields: UnknownFields,
}
