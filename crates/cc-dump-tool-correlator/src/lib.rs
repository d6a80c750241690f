//! Tool correlator: matches `tool_use` blocks with their later `tool_result`
//! by id, and hands out a shared color index per distinct tool_use id so the
//! rasterizer can paint a tool call and its result the same color.

use cc_dump_wire::{ContentBlock, Message, MessageContent, ToolResultContent};
use indexmap::IndexMap;

/// A correlated tool call, with its result attached once seen.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: Option<String>,
    pub input: Option<serde_json::Value>,
    pub color_idx: u32,
    pub result: Option<ToolResult>,
    /// Set when a `tool_result` was seen with no matching `tool_use`.
    pub incomplete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

/// Per-request correlator state. A fresh instance per request: tool ids are
/// only meaningful within one request/response cycle's message history.
#[derive(Debug, Default)]
pub struct ToolCorrelator {
    color_counter: u32,
    by_id: IndexMap<String, ToolInvocation>,
}

impl ToolCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_color(&mut self) -> u32 {
        let idx = self.color_counter;
        self.color_counter += 1;
        idx
    }

    /// Scans request messages in order, correlating `tool_use`/`tool_result`
    /// pairs by id. Returns the invocations in first-seen order.
    pub fn correlate(&mut self, messages: &[Message]) -> Vec<ToolInvocation> {
        for message in messages {
            let MessageContent::Blocks(blocks) = &message.content else {
                continue;
            };
            for block in blocks {
                match block {
                    ContentBlock::ToolUse { id, name, input, .. } => {
                        if let Some(existing) = self.by_id.get(id) {
                            log::warn!(
                                "duplicate tool_use id {id} (existing name {:?}); keeping first binding",
                                existing.name
                            );
                            continue;
                        }
                        let color_idx = self.alloc_color();
                        self.by_id.insert(
                            id.clone(),
                            ToolInvocation {
                                id: id.clone(),
                                name: Some(name.clone()),
                                input: Some(input.clone()),
                                color_idx,
                                result: None,
                                incomplete: false,
                            },
                        );
                    }
                    ContentBlock::ToolResult { tool_use_id, content, is_error, .. } => {
                        let content_text = flatten_tool_result_content(content.as_ref());
                        let is_error = is_error.unwrap_or(false);

                        if let Some(invocation) = self.by_id.get_mut(tool_use_id) {
                            invocation.result = Some(ToolResult { content: content_text, is_error });
                        } else {
                            let color_idx = self.alloc_color();
                            self.by_id.insert(
                                tool_use_id.clone(),
                                ToolInvocation {
                                    id: tool_use_id.clone(),
                                    name: None,
                                    input: None,
                                    color_idx,
                                    result: Some(ToolResult { content: content_text, is_error }),
                                    incomplete: true,
                                },
                            );
                        }
                    }
                    _ => {}
                }
            }
        }

        self.by_id.values().cloned().collect()
    }
}

fn flatten_tool_result_content(content: Option<&ToolResultContent>) -> String {
    match content {
        None => String::new(),
        Some(ToolResultContent::Text(text)) => text.clone(),
        Some(ToolResultContent::Blocks(blocks)) => blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use cc_dump_wire::Role;
    use pretty_assertions::assert_eq;

    use super::*;

    fn message(role: Role, blocks: Vec<ContentBlock>) -> Message {
        Message { role, content: MessageContent::Blocks(blocks) }
    }

    #[test]
    fn tool_use_and_result_share_color_and_inherit_name() {
        let messages = vec![
            message(
                Role::Assistant,
                vec![ContentBlock::ToolUse {
                    id: "tu_1".into(),
                    name: "Read".into(),
                    input: serde_json::json!({"path": "a.py"}),
                    cache_control: None,
                    unknown_fields: Default::default(),
                }],
            ),
            message(
                Role::User,
                vec![ContentBlock::ToolResult {
                    tool_use_id: "tu_1".into(),
                    content: Some(ToolResultContent::Text("contents".into())),
                    is_error: Some(false),
                    cache_control: None,
                    unknown_fields: Default::default(),
                }],
            ),
        ];

        let mut correlator = ToolCorrelator::new();
        let invocations = correlator.correlate(&messages);

        assert_eq!(invocations.len(), 1);
        let invocation = &invocations[0];
        assert_eq!(invocation.name.as_deref(), Some("Read"));
        assert_eq!(invocation.result.as_ref().unwrap().content, "contents");
        assert!(!invocation.incomplete);
    }

    #[test]
    fn orphan_tool_result_is_marked_incomplete() {
        let messages = vec![message(
            Role::User,
            vec![ContentBlock::ToolResult {
                tool_use_id: "tu_missing".into(),
                content: Some(ToolResultContent::Text("x".into())),
                is_error: Some(false),
                cache_control: None,
                unknown_fields: Default::default(),
            }],
        )];

        let mut correlator = ToolCorrelator::new();
        let invocations = correlator.correlate(&messages);
        assert_eq!(invocations.len(), 1);
        assert!(invocations[0].incomplete);
        assert!(invocations[0].name.is_none());
    }

    #[test]
    fn duplicate_tool_use_ids_keep_first_binding() {
        let messages = vec![message(
            Role::Assistant,
            vec![
                ContentBlock::ToolUse {
                    id: "tu_1".into(),
                    name: "First".into(),
                    input: serde_json::json!({}),
                    cache_control: None,
                    unknown_fields: Default::default(),
                },
                ContentBlock::ToolUse {
                    id: "tu_1".into(),
                    name: "Second".into(),
                    input: serde_json::json!({}),
                    cache_control: None,
                    unknown_fields: Default::default(),
                },
            ],
        )];

        let mut correlator = ToolCorrelator::new();
        let invocations = correlator.correlate(&messages);
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].name.as_deref(), Some("First"));
    }
}
