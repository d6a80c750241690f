use serde::{Deserialize, Serialize};

use crate::unknown_fields::UnknownFields;

/// Optional cache-control hint carried by several content block kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub kind: String,
}

/// A single content block as it appears in `messages[].content`, on either
/// side of the wire (request or reconstructed response).
///
/// Unrecognized `type` tags deserialize into `Unknown` rather than failing,
/// so the formatter can still emit a block for them (`UnknownTypeBlock`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
        #[serde(flatten)]
        unknown_fields: UnknownFields,
    },
    Image {
        source: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
        #[serde(flatten)]
        unknown_fields: UnknownFields,
    },
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        #[serde(flatten)]
        unknown_fields: UnknownFields,
    },
    RedactedThinking {
        data: String,
        #[serde(flatten)]
        unknown_fields: UnknownFields,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
        #[serde(flatten)]
        unknown_fields: UnknownFields,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Option<ToolResultContent>,
        #[serde(default)]
        is_error: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
        #[serde(flatten)]
        unknown_fields: UnknownFields,
    },
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

/// `tool_result.content` may be a bare string or a list of content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// `system` may be a bare string or a list of system-prompt blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    Text(String),
    Blocks(Vec<SystemBlock>),
}

impl SystemPrompt {
    /// Flattens to the plain text cc-dump's content tracker hashes per section.
    ///
    /// A bare-string system prompt is treated as a single section; a block
    /// list yields one section per block.
    pub fn sections(&self) -> Vec<&str> {
        match self {
            SystemPrompt::Text(t) => vec![t.as_str()],
            SystemPrompt::Blocks(blocks) => blocks.iter().map(|b| b.text.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
    #[serde(flatten)]
    pub unknown_fields: UnknownFields,
}
