//! Formatter: turns parsed API JSON into the ordered block list the turn
//! store rasterizes, invoking the content tracker (C2) and tool correlator
//! (C3) along the way.
//!
//! Construction never fails: unrecognized content always yields a block —
//! `UnknownTypeBlock` for unknown shapes — rather than an error, per the
//! IR's own no-data-loss contract.

use cc_dump_block_ir::{detect_regions, BlockPayload, Category, FormattedBlock, TrackStatus as IrTrackStatus};
use cc_dump_content_tracker::{ContentTrackerState, TrackOutcome};
use cc_dump_tool_correlator::{ToolCorrelator, ToolInvocation};
use cc_dump_wire::{ContentBlock, Request, ResponseMessage, StreamEvent};

/// Byte threshold above which a first-message text block is routed through
/// the content tracker instead of rendering as plain `TextContentBlock`.
pub const TRACKED_TEXT_THRESHOLD_BYTES: usize = 500;

/// Byte threshold above which a block's free-form text is scanned for
/// `content_regions` (code fences, XML sections). Short text rarely has
/// enough structure to be worth segmenting.
pub const REGION_SCAN_THRESHOLD_BYTES: usize = 120;

/// Runs region detection over `text` and attaches the result to `block` only
/// when at least one region was found, so untouched blocks keep
/// `content_regions: None` rather than an empty `Some(vec![])`.
fn with_detected_regions(block: FormattedBlock, text: &str) -> FormattedBlock {
    if text.len() < REGION_SCAN_THRESHOLD_BYTES {
        return block;
    }
    let regions = detect_regions(text);
    if regions.is_empty() {
        block
    } else {
        block.with_regions(regions)
    }
}

/// Session-lifetime mutable state threaded through every formatter call.
/// Owned by the session, not a hidden global (spec §9).
#[derive(Debug, Default)]
pub struct FormatterState {
    pub content_tracker: ContentTrackerState,
}

impl FormatterState {
    pub fn new() -> Self {
        Self::default()
    }
}

fn track_outcome_to_ir(outcome: TrackOutcome) -> (u64, IrTrackStatus, u32) {
    match outcome {
        TrackOutcome::New { tag_id, color_idx } => (tag_id, IrTrackStatus::New, color_idx),
        TrackOutcome::Ref { tag_id } => (tag_id, IrTrackStatus::Ref, 0),
        TrackOutcome::Changed { tag_id, unified_diff } => (tag_id, IrTrackStatus::Changed { unified_diff }, 0),
    }
}

fn image_media_type(source: &serde_json::Value) -> String {
    source
        .get("media_type")
        .and_then(|v| v.as_str())
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn unknown_block(raw: &serde_json::Value) -> FormattedBlock {
    let type_tag = raw.get("type").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
    FormattedBlock::new(BlockPayload::UnknownTypeBlock { type_tag, raw: raw.clone() })
}

fn content_block_to_formatted(
    block: &ContentBlock,
    category: Category,
    invocations: &[ToolInvocation],
) -> FormattedBlock {
    match block {
        ContentBlock::Text { text, .. } => with_detected_regions(
            FormattedBlock::with_category(BlockPayload::TextContentBlock { text: text.clone(), role: category_role_label(category) }, category),
            text,
        ),
        ContentBlock::Image { source, .. } => FormattedBlock::new(BlockPayload::ImageBlock { media_type: image_media_type(source) }),
        ContentBlock::Thinking { thinking, signature, .. } => {
            FormattedBlock::new(BlockPayload::ThinkingBlock { text: thinking.clone(), signature: signature.clone() })
        }
        ContentBlock::RedactedThinking { .. } => {
            FormattedBlock::new(BlockPayload::ThinkingBlock { text: "[redacted]".to_string(), signature: None })
        }
        ContentBlock::ToolUse { id, name, input, .. } => {
            let color_idx = invocations.iter().find(|i| &i.id == id).map(|i| i.color_idx).unwrap_or(0);
            FormattedBlock::new(BlockPayload::ToolUseBlock { id: id.clone(), name: name.clone(), input: input.clone(), color_idx })
        }
        ContentBlock::ToolResult { tool_use_id, is_error, .. } => {
            let invocation = invocations.iter().find(|i| &i.id == tool_use_id);
            let content = invocation.and_then(|i| i.result.as_ref()).map(|r| r.content.clone()).unwrap_or_default();
            let name = invocation.and_then(|i| i.name.clone());
            let incomplete = invocation.map(|i| i.incomplete).unwrap_or(true);
            let color_idx = invocation.map(|i| i.color_idx);
            with_detected_regions(
                FormattedBlock::new(BlockPayload::ToolResultBlock {
                    tool_use_id: tool_use_id.clone(),
                    name,
                    content: content.clone(),
                    is_error: is_error.unwrap_or(false),
                    color_idx,
                    incomplete,
                }),
                &content,
            )
        }
        ContentBlock::Unknown(value) => unknown_block(value),
    }
}

fn category_role_label(category: Category) -> String {
    match category {
        Category::User => "user".to_string(),
        Category::Assistant => "assistant".to_string(),
        _ => "unknown".to_string(),
    }
}

/// `format_request(body, state) -> list<Block>` — formats the request side
/// of one exchange: header, metadata, system prompt (content-tracked),
/// tool definitions, and every message with its content blocks.
pub fn format_request(body: &Request, state: &mut FormatterState, timestamp: String) -> Vec<FormattedBlock> {
    let mut blocks = Vec::new();

    blocks.push(FormattedBlock::new(BlockPayload::HeaderBlock { timestamp }));
    blocks.push(FormattedBlock::new(BlockPayload::MetadataBlock {
        model: body.model.clone(),
        stream: body.stream,
        extra: serde_json::json!({ "max_tokens": body.max_tokens }),
    }));

    if let Some(system) = &body.system {
        blocks.push(FormattedBlock::new(BlockPayload::SystemSection));
        for (section_index, section) in system.sections().into_iter().enumerate() {
            let outcome = state.content_tracker.track(section, (0, section_index));
            let (tag_id, status, color_idx) = track_outcome_to_ir(outcome);
            blocks.push(with_detected_regions(
                FormattedBlock::new(BlockPayload::TrackedContentBlock { tag_id, status, text: section.to_string(), color_idx }),
                section,
            ));
        }
    }

    if let Some(tools) = &body.tools {
        blocks.push(FormattedBlock::new(BlockPayload::ToolDefsSection));
        blocks.push(FormattedBlock::new(BlockPayload::ToolDefinitionsBlock { count: tools.len() }));
        for tool in tools {
            blocks.push(FormattedBlock::new(BlockPayload::ToolDefBlock {
                name: tool.name.clone(),
                description: tool.description.clone(),
            }));
        }
    }

    let mut correlator = ToolCorrelator::new();
    let invocations = correlator.correlate(&body.messages);

    for (message_index, message) in body.messages.iter().enumerate() {
        let role = message.role.as_str();
        let category = Category::from_role(role);
        blocks.push(FormattedBlock::with_category(
            BlockPayload::MessageBlock { role: role.to_string(), message_index },
            category,
        ));

        for (section_index, content_block) in message.content.blocks().iter().enumerate() {
            let is_large_first_message_text = message_index == 0
                && matches!(content_block, ContentBlock::Text { text, .. } if text.len() > TRACKED_TEXT_THRESHOLD_BYTES);

            if is_large_first_message_text {
                if let ContentBlock::Text { text, .. } = content_block {
                    // Offset by one past the system prompt's positional range so first-message
                    // tracked text never collides with system section keys.
                    let outcome = state.content_tracker.track(text, (message_index + 1, section_index));
                    let (tag_id, status, color_idx) = track_outcome_to_ir(outcome);
                    blocks.push(with_detected_regions(
                        FormattedBlock::new(BlockPayload::TrackedContentBlock { tag_id, status, text: text.clone(), color_idx }),
                        text,
                    ));
                    continue;
                }
            }

            blocks.push(content_block_to_formatted(content_block, category, &invocations));
        }
    }

    blocks
}

/// `format_response_event(event, state) -> list<Block>` — formats a single
/// parsed SSE event into zero or more blocks. Called once per event during
/// streaming; the turn store is responsible for buffering/replacing tail
/// strips from the resulting blocks.
pub fn format_response_event(event: &StreamEvent, _state: &mut FormatterState) -> Vec<FormattedBlock> {
    match event {
        StreamEvent::MessageStart { message } => vec![
            FormattedBlock::new(BlockPayload::ResponseMetadataSection),
            FormattedBlock::with_category(
                BlockPayload::ResponseMessageBlock { role: message.role.clone() },
                Category::from_role(&message.role),
            ),
        ],
        StreamEvent::ContentBlockStart { content_block, .. } => match content_block {
            ContentBlock::ToolUse { id, name, .. } => vec![FormattedBlock::new(BlockPayload::StreamToolUseBlock {
                id: id.clone(),
                name: Some(name.clone()),
                partial_json: String::new(),
            })],
            _ => Vec::new(),
        },
        StreamEvent::ContentBlockDelta { index, delta } => {
            if let Some(text) = &delta.text {
                vec![FormattedBlock::with_category(
                    BlockPayload::TextDeltaBlock { text: text.clone(), content_index: *index },
                    Category::Assistant,
                )]
            } else if let Some(partial_json) = &delta.partial_json {
                vec![FormattedBlock::new(BlockPayload::StreamToolUseBlock {
                    id: String::new(),
                    name: None,
                    partial_json: partial_json.clone(),
                })]
            } else if let Some(thinking) = &delta.thinking {
                vec![FormattedBlock::new(BlockPayload::ThinkingBlock { text: thinking.clone(), signature: delta.signature.clone() })]
            } else {
                Vec::new()
            }
        }
        StreamEvent::ContentBlockStop { .. } => Vec::new(),
        StreamEvent::MessageDelta { delta, usage } => {
            let mut out = Vec::new();
            if let Some(reason) = &delta.stop_reason {
                out.push(FormattedBlock::new(BlockPayload::StopReasonBlock { reason: reason.clone() }));
            }
            out.push(FormattedBlock::new(BlockPayload::TurnBudgetBlock { budget_tokens: Some(usage.output_tokens) }));
            out
        }
        StreamEvent::MessageStop | StreamEvent::Ping => Vec::new(),
        StreamEvent::Error { error } => vec![FormattedBlock::new(BlockPayload::ErrorBlock { code: None, reason: error.message.clone() })],
        StreamEvent::Unknown(value) => vec![unknown_block(value)],
    }
}

/// `format_complete_response(message, state) -> list<Block>` — formats a
/// fully assembled (non-streaming-shaped) assistant message: used directly
/// for non-streaming upstream responses, and by the replayer for archived
/// entries.
pub fn format_complete_response(message: &ResponseMessage, _state: &mut FormatterState) -> Vec<FormattedBlock> {
    let mut blocks = vec![
        FormattedBlock::new(BlockPayload::ResponseMetadataSection),
        FormattedBlock::with_category(BlockPayload::ResponseMessageBlock { role: message.role.clone() }, Category::from_role(&message.role)),
    ];

    let mut correlator = ToolCorrelator::new();
    let synthetic_message = cc_dump_wire::Message {
        role: cc_dump_wire::Role::Assistant,
        content: cc_dump_wire::MessageContent::Blocks(message.content.clone()),
    };
    let invocations = correlator.correlate(std::slice::from_ref(&synthetic_message));

    let category = Category::from_role(&message.role);
    for content_block in &message.content {
        blocks.push(content_block_to_formatted(content_block, category, &invocations));
    }

    if let Some(reason) = &message.stop_reason {
        blocks.push(FormattedBlock::new(BlockPayload::StopReasonBlock { reason: reason.clone() }));
    }
    blocks.push(FormattedBlock::new(BlockPayload::TurnBudgetBlock { budget_tokens: Some(message.usage.output_tokens) }));

    blocks
}
