use cc_dump_wire::{ContentBlock, Delta, ResponseMessage, StreamEvent, StreamMessageStart, Usage};

/// Per-content-block accumulation state while a streaming response is in
/// flight, keyed by the SSE `index` field. Mirrors the shape
/// `AnthropicStreamProcessor` reconstructs in the teacher's provider code,
/// generalized from "collect the final answer" to "collect a faithful
/// synthetic non-streaming response" (spec.md §4.10).
#[derive(Debug, Clone)]
enum BlockAccumulator {
    Text(String),
    Thinking { text: String, signature: Option<String> },
    ToolUse { id: String, name: String, partial_json: String },
    /// A content block kind the accumulator doesn't special-case (e.g. an
    /// image echoed back, which assistant responses never actually emit,
    /// or a future block type); carried as-is so no data is lost.
    Opaque(ContentBlock),
}

/// Accumulates one streaming response's SSE events into the canonical
/// message the recorder archives, per spec.md §4.10: "concatenates
/// `content_block_delta` text_delta fragments per block index into
/// consolidated content blocks; merges usage from `message_start` and
/// `message_delta`".
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    message_start: Option<StreamMessageStart>,
    blocks: Vec<Option<BlockAccumulator>>,
    usage: Usage,
    stop_reason: Option<String>,
    stop_sequence: Option<String>,
    /// Set directly when the upstream response was already non-streaming
    /// (no deltas to reassemble), bypassing the block accumulator entirely.
    complete: Option<ResponseMessage>,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a complete message straight through, for upstream responses
    /// that were never streamed in the first place (spec.md's
    /// `complete_response` synthetic event).
    pub fn apply_complete(&mut self, message: ResponseMessage) {
        self.complete = Some(message);
    }

    pub fn apply(&mut self, event_type: &str, event: &StreamEvent) {
        match event {
            StreamEvent::MessageStart { message } => {
                self.usage = message.usage.clone();
                self.message_start = Some(message.clone());
            }
            StreamEvent::ContentBlockStart { index, content_block } => {
                self.ensure_slot(*index);
                self.blocks[*index] = Some(match content_block {
                    ContentBlock::Text { .. } => BlockAccumulator::Text(String::new()),
                    ContentBlock::Thinking { signature, .. } => BlockAccumulator::Thinking { text: String::new(), signature: signature.clone() },
                    ContentBlock::ToolUse { id, name, .. } => {
                        BlockAccumulator::ToolUse { id: id.clone(), name: name.clone(), partial_json: String::new() }
                    }
                    other => BlockAccumulator::Opaque(other.clone()),
                });
            }
            StreamEvent::ContentBlockDelta { index, delta } => {
                self.ensure_slot(*index);
                if let Some(Some(accumulator)) = self.blocks.get_mut(*index) {
                    apply_delta(accumulator, delta);
                }
            }
            StreamEvent::ContentBlockStop { .. } => {}
            StreamEvent::MessageDelta { delta, usage } => {
                self.usage.merge(usage);
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason.clone();
                }
                if delta.stop_sequence.is_some() {
                    self.stop_sequence = delta.stop_sequence.clone();
                }
            }
            StreamEvent::MessageStop | StreamEvent::Ping | StreamEvent::Error { .. } | StreamEvent::Unknown(_) => {}
        }
        let _ = event_type;
    }

    fn ensure_slot(&mut self, index: usize) {
        if self.blocks.len() <= index {
            self.blocks.resize(index + 1, None);
        }
    }

    /// Assembles the canonical non-streaming message. `None` only if no
    /// `message_start` was ever observed (malformed or empty stream).
    pub fn finish(self) -> Option<ResponseMessage> {
        if let Some(message) = self.complete {
            return Some(message);
        }
        let start = self.message_start?;
        let content = self.blocks.into_iter().flatten().map(finalize_block).collect();

        Some(ResponseMessage {
            id: start.id,
            kind: "message".to_string(),
            role: start.role,
            content,
            model: start.model,
            stop_reason: self.stop_reason,
            stop_sequence: self.stop_sequence,
            usage: self.usage,
            unknown_fields: start.unknown_fields,
        })
    }
}

fn apply_delta(accumulator: &mut BlockAccumulator, delta: &Delta) {
    match accumulator {
        BlockAccumulator::Text(text) => {
            if let Some(fragment) = &delta.text {
                text.push_str(fragment);
            }
        }
        BlockAccumulator::Thinking { text, signature } => {
            if let Some(fragment) = &delta.thinking {
                text.push_str(fragment);
            }
            if delta.signature.is_some() {
                *signature = delta.signature.clone();
            }
        }
        BlockAccumulator::ToolUse { partial_json, .. } => {
            if let Some(fragment) = &delta.partial_json {
                partial_json.push_str(fragment);
            }
        }
        BlockAccumulator::Opaque(_) => {}
    }
}

fn finalize_block(accumulator: BlockAccumulator) -> ContentBlock {
    match accumulator {
        BlockAccumulator::Text(text) => ContentBlock::Text { text, cache_control: None, unknown_fields: Default::default() },
        BlockAccumulator::Thinking { text, signature } => ContentBlock::Thinking { thinking: text, signature, unknown_fields: Default::default() },
        BlockAccumulator::ToolUse { id, name, partial_json } => {
            let input = if partial_json.is_empty() {
                serde_json::Value::Object(Default::default())
            } else {
                serde_json::from_str(&partial_json).unwrap_or(serde_json::Value::Null)
            };
            ContentBlock::ToolUse { id, name, input, cache_control: None, unknown_fields: Default::default() }
        }
        BlockAccumulator::Opaque(block) => block,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn message_start(usage: Usage) -> StreamMessageStart {
        StreamMessageStart {
            id: "msg_1".into(),
            kind: "message".into(),
            role: "assistant".into(),
            model: "claude-x".into(),
            content: Vec::new(),
            usage,
            unknown_fields: Default::default(),
        }
    }

    #[test]
    fn concatenates_text_deltas_across_the_same_index() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator.apply("message_start", &StreamEvent::MessageStart { message: message_start(Usage { input_tokens: 25, ..Default::default() }) });
        accumulator.apply(
            "content_block_start",
            &StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ContentBlock::Text { text: String::new(), cache_control: None, unknown_fields: Default::default() },
            },
        );
        accumulator.apply(
            "content_block_delta",
            &StreamEvent::ContentBlockDelta { index: 0, delta: Delta { kind: "text_delta".into(), text: Some("Hi".into()), partial_json: None, thinking: None, signature: None } },
        );
        accumulator.apply(
            "content_block_delta",
            &StreamEvent::ContentBlockDelta { index: 0, delta: Delta { kind: "text_delta".into(), text: Some("!".into()), partial_json: None, thinking: None, signature: None } },
        );
        accumulator.apply(
            "message_delta",
            &StreamEvent::MessageDelta { delta: cc_dump_wire::MessageDelta { stop_reason: Some("end_turn".into()), stop_sequence: None }, usage: Usage { output_tokens: 5, ..Default::default() } },
        );

        let message = accumulator.finish().unwrap();
        assert_eq!(message.content.len(), 1);
        match &message.content[0] {
            ContentBlock::Text { text, .. } => assert_eq!(text, "Hi!"),
            other => panic!("expected Text, got {other:?}"),
        }
        assert_eq!(message.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(message.usage.input_tokens, 25);
        assert_eq!(message.usage.output_tokens, 5);
    }

    #[test]
    fn reassembles_tool_use_input_from_partial_json_fragments() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator.apply("message_start", &StreamEvent::MessageStart { message: message_start(Usage::default()) });
        accumulator.apply(
            "content_block_start",
            &StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ContentBlock::ToolUse { id: "tu_1".into(), name: "Read".into(), input: serde_json::Value::Null, cache_control: None, unknown_fields: Default::default() },
            },
        );
        for fragment in ["{\"path\"", ":\"a.py\"}"] {
            accumulator.apply(
                "content_block_delta",
                &StreamEvent::ContentBlockDelta { index: 0, delta: Delta { kind: "input_json_delta".into(), text: None, partial_json: Some(fragment.into()), thinking: None, signature: None } },
            );
        }

        let message = accumulator.finish().unwrap();
        match &message.content[0] {
            ContentBlock::ToolUse { name, input, .. } => {
                assert_eq!(name, "Read");
                assert_eq!(input, &serde_json::json!({"path": "a.py"}));
            }
            other => panic!("expected ToolUse, got {other:?}"),
        }
    }
}
