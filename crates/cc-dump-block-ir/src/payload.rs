use serde::{Deserialize, Serialize};

/// Outcome of content tracking for a section, mirrored here (rather than
/// depending on `cc-dump-content-tracker`) so the IR crate has no knowledge
/// of the tracker's hashing internals — it only carries the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackStatus {
    New,
    Ref,
    Changed { unified_diff: String },
}

/// Every semantic unit a turn's blocks can be. Discriminant doubles as the
/// stable renderer-dispatch key (`#[serde(rename_all = "snake_case")]`
/// lowercases the variant name, e.g. `TextContentBlock` -> `text_content_block`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockPayload {
    SeparatorBlock,
    HeaderBlock { timestamp: String },
    RoleBlock { role: String },
    NewlineBlock,
    NewSessionBlock,
    MessageBlock { role: String, message_index: usize },
    MetadataSection,
    SystemSection,
    ToolDefsSection,
    ResponseMetadataSection,
    ResponseMessageBlock { role: String },
    TextContentBlock { text: String, role: String },
    TextDeltaBlock { text: String, content_index: usize },
    ImageBlock { media_type: String },
    ThinkingBlock { text: String, signature: Option<String> },
    TrackedContentBlock { tag_id: u64, status: TrackStatus, text: String, color_idx: u32 },
    ConfigContentBlock { text: String },
    HookOutputBlock { text: String },
    MetadataBlock { model: String, stream: bool, extra: serde_json::Value },
    HttpHeadersBlock { headers: Vec<(String, String)> },
    TurnBudgetBlock { budget_tokens: Option<u32> },
    StopReasonBlock { reason: String },
    StreamInfoBlock { stream: bool },
    SystemLabelBlock { label: String },
    ToolDefinitionsBlock { count: usize },
    ToolDefBlock { name: String, description: Option<String> },
    SkillDefChild { name: String },
    AgentDefChild { name: String },
    ToolUseBlock { id: String, name: String, input: serde_json::Value, color_idx: u32 },
    ToolResultBlock {
        tool_use_id: String,
        name: Option<String>,
        content: String,
        is_error: bool,
        color_idx: Option<u32>,
        incomplete: bool,
    },
    ToolUseSummaryBlock { count: usize },
    StreamToolUseBlock { id: String, name: Option<String>, partial_json: String },
    ErrorBlock { code: Option<u16>, reason: String },
    ProxyErrorBlock { description: String },
    UnknownTypeBlock { type_tag: String, raw: serde_json::Value },
}

impl BlockPayload {
    /// The stable renderer-dispatch key used by `cc-dump-rasterizer`'s
    /// variant-keyed dispatch table. Kept independent of `serde`'s own tag
    /// rendering so the rasterizer never has to serialize a block to find
    /// its renderer.
    pub fn renderer_key(&self) -> &'static str {
        match self {
            BlockPayload::SeparatorBlock => "separator_block",
            BlockPayload::HeaderBlock { .. } => "header_block",
            BlockPayload::RoleBlock { .. } => "role_block",
            BlockPayload::NewlineBlock => "newline_block",
            BlockPayload::NewSessionBlock => "new_session_block",
            BlockPayload::MessageBlock { .. } => "message_block",
            BlockPayload::MetadataSection => "metadata_section",
            BlockPayload::SystemSection => "system_section",
            BlockPayload::ToolDefsSection => "tool_defs_section",
            BlockPayload::ResponseMetadataSection => "response_metadata_section",
            BlockPayload::ResponseMessageBlock { .. } => "response_message_block",
            BlockPayload::TextContentBlock { .. } => "text_content_block",
            BlockPayload::TextDeltaBlock { .. } => "text_delta_block",
            BlockPayload::ImageBlock { .. } => "image_block",
            BlockPayload::ThinkingBlock { .. } => "thinking_block",
            BlockPayload::TrackedContentBlock { .. } => "tracked_content_block",
            BlockPayload::ConfigContentBlock { .. } => "config_content_block",
            BlockPayload::HookOutputBlock { .. } => "hook_output_block",
            BlockPayload::MetadataBlock { .. } => "metadata_block",
            BlockPayload::HttpHeadersBlock { .. } => "http_headers_block",
            BlockPayload::TurnBudgetBlock { .. } => "turn_budget_block",
            BlockPayload::StopReasonBlock { .. } => "stop_reason_block",
            BlockPayload::StreamInfoBlock { .. } => "stream_info_block",
            BlockPayload::SystemLabelBlock { .. } => "system_label_block",
            BlockPayload::ToolDefinitionsBlock { .. } => "tool_definitions_block",
            BlockPayload::ToolDefBlock { .. } => "tool_def_block",
            BlockPayload::SkillDefChild { .. } => "skill_def_child",
            BlockPayload::AgentDefChild { .. } => "agent_def_child",
            BlockPayload::ToolUseBlock { .. } => "tool_use_block",
            BlockPayload::ToolResultBlock { .. } => "tool_result_block",
            BlockPayload::ToolUseSummaryBlock { .. } => "tool_use_summary_block",
            BlockPayload::StreamToolUseBlock { .. } => "stream_tool_use_block",
            BlockPayload::ErrorBlock { .. } => "error_block",
            BlockPayload::ProxyErrorBlock { .. } => "proxy_error_block",
            BlockPayload::UnknownTypeBlock { .. } => "unknown_type_block",
        }
    }

    /// The text a search query is matched against, if this variant carries
    /// any free-form content worth searching. Blocks with no textual payload
    /// (separators, role markers, metadata counts) return `None` and are
    /// never search hits.
    pub fn searchable_text(&self) -> Option<&str> {
        match self {
            BlockPayload::TextContentBlock { text, .. }
            | BlockPayload::TextDeltaBlock { text, .. }
            | BlockPayload::ThinkingBlock { text, .. }
            | BlockPayload::TrackedContentBlock { text, .. }
            | BlockPayload::ConfigContentBlock { text }
            | BlockPayload::HookOutputBlock { text } => Some(text),
            BlockPayload::ToolResultBlock { content, .. } => Some(content),
            BlockPayload::ToolDefBlock { description: Some(description), .. } => Some(description),
            BlockPayload::ErrorBlock { reason, .. } | BlockPayload::ProxyErrorBlock { description: reason } => Some(reason),
            BlockPayload::StreamToolUseBlock { partial_json, .. } => Some(partial_json),
            _ => None,
        }
    }

    /// The fixed category for variants whose category never depends on
    /// construction context. Polymorphic variants (role/message/text blocks)
    /// return `None`; their category is set exactly once by the formatter
    /// from parent context, per the IR's category invariant.
    pub fn fixed_category(&self) -> Option<crate::Category> {
        use crate::Category::*;
        match self {
            BlockPayload::SeparatorBlock
            | BlockPayload::NewlineBlock
            | BlockPayload::NewSessionBlock => Some(AlwaysVisible),
            BlockPayload::HeaderBlock { .. } => Some(Headers),
            BlockPayload::MetadataSection | BlockPayload::MetadataBlock { .. } => Some(Metadata),
            BlockPayload::SystemSection
            | BlockPayload::TrackedContentBlock { .. }
            | BlockPayload::ConfigContentBlock { .. }
            | BlockPayload::SystemLabelBlock { .. } => Some(System),
            BlockPayload::ToolDefsSection
            | BlockPayload::ToolDefinitionsBlock { .. }
            | BlockPayload::ToolDefBlock { .. }
            | BlockPayload::SkillDefChild { .. }
            | BlockPayload::AgentDefChild { .. }
            | BlockPayload::ToolUseBlock { .. }
            | BlockPayload::ToolResultBlock { .. }
            | BlockPayload::ToolUseSummaryBlock { .. }
            | BlockPayload::StreamToolUseBlock { .. } => Some(Tools),
            BlockPayload::ThinkingBlock { .. } => Some(Thinking),
            BlockPayload::TurnBudgetBlock { .. } => Some(Budget),
            BlockPayload::ResponseMetadataSection
            | BlockPayload::HttpHeadersBlock { .. }
            | BlockPayload::StreamInfoBlock { .. } => Some(Headers),
            BlockPayload::StopReasonBlock { .. } => Some(Metadata),
            BlockPayload::HookOutputBlock { .. } => Some(Tools),
            BlockPayload::ErrorBlock { .. } | BlockPayload::ProxyErrorBlock { .. } => Some(AlwaysVisible),
            BlockPayload::UnknownTypeBlock { .. } => Some(AlwaysVisible),
            BlockPayload::RoleBlock { .. }
            | BlockPayload::MessageBlock { .. }
            | BlockPayload::ResponseMessageBlock { .. }
            | BlockPayload::TextContentBlock { .. }
            | BlockPayload::TextDeltaBlock { .. }
            | BlockPayload::ImageBlock { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn searchable_text_covers_free_form_variants() {
        assert_eq!(BlockPayload::TextContentBlock { text: "hi".into(), role: "user".into() }.searchable_text(), Some("hi"));
        assert_eq!(
            BlockPayload::ToolResultBlock {
                tool_use_id: "tu_1".into(),
                name: None,
                content: "output".into(),
                is_error: false,
                color_idx: None,
                incomplete: false,
            }
            .searchable_text(),
            Some("output")
        );
        assert_eq!(BlockPayload::SeparatorBlock.searchable_text(), None);
    }
}
