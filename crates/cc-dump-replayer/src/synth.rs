use cc_dump_wire::{ContentBlock, Delta, MessageDelta, ResponseMessage, StreamEvent, StreamMessageStart, Usage};

/// Target chunk size for re-splitting a reconstructed block's text back into
/// deltas. Arbitrary — spec.md explicitly accepts delta-count divergence
/// from the original stream as long as the concatenated text matches.
const REPLAY_CHUNK_CHARS: usize = 48;

/// Splits `text` on char boundaries into chunks of roughly
/// `REPLAY_CHUNK_CHARS` characters. Returns a single empty chunk for empty
/// input so callers always get at least one delta event per block.
fn chunk_text(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return vec![""];
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut count = 0;
    for (byte_index, _) in &chars {
        if count > 0 && count % REPLAY_CHUNK_CHARS == 0 {
            chunks.push(&text[start..*byte_index]);
            start = *byte_index;
        }
        count += 1;
    }
    chunks.push(&text[start..]);
    chunks
}

/// Re-expands one reconstructed [`ResponseMessage`] into the ordered
/// `(event_type, StreamEvent)` sequence a live streaming call would have
/// produced: one `message_start`, then per content block a
/// `content_block_start` + delta(s) + `content_block_stop`, then one
/// `message_delta` and one `message_stop` (spec.md §4.11).
pub fn synthesize_response_events(message: &ResponseMessage) -> Vec<(&'static str, StreamEvent)> {
    let mut events = Vec::new();

    events.push((
        "message_start",
        StreamEvent::MessageStart {
            message: StreamMessageStart {
                id: message.id.clone(),
                kind: message.kind.clone(),
                role: message.role.clone(),
                model: message.model.clone(),
                content: Vec::new(),
                usage: message.usage.clone(),
                unknown_fields: message.unknown_fields.clone(),
            },
        },
    ));

    for (index, block) in message.content.iter().enumerate() {
        synthesize_block(index, block, &mut events);
    }

    events.push((
        "message_delta",
        StreamEvent::MessageDelta {
            delta: MessageDelta { stop_reason: message.stop_reason.clone(), stop_sequence: message.stop_sequence.clone() },
            usage: Usage { output_tokens: message.usage.output_tokens, ..Default::default() },
        },
    ));
    events.push(("message_stop", StreamEvent::MessageStop));

    events
}

fn synthesize_block(index: usize, block: &ContentBlock, events: &mut Vec<(&'static str, StreamEvent)>) {
    match block {
        ContentBlock::Text { text, cache_control, unknown_fields } => {
            events.push((
                "content_block_start",
                StreamEvent::ContentBlockStart {
                    index,
                    content_block: ContentBlock::Text { text: String::new(), cache_control: cache_control.clone(), unknown_fields: unknown_fields.clone() },
                },
            ));
            for chunk in chunk_text(text) {
                events.push((
                    "content_block_delta",
                    StreamEvent::ContentBlockDelta {
                        index,
                        delta: Delta { kind: "text_delta".to_string(), text: Some(chunk.to_string()), partial_json: None, thinking: None, signature: None },
                    },
                ));
            }
            events.push(("content_block_stop", StreamEvent::ContentBlockStop { index }));
        }
        ContentBlock::Thinking { thinking, signature, unknown_fields } => {
            events.push((
                "content_block_start",
                StreamEvent::ContentBlockStart {
                    index,
                    content_block: ContentBlock::Thinking { thinking: String::new(), signature: None, unknown_fields: unknown_fields.clone() },
                },
            ));
            for chunk in chunk_text(thinking) {
                events.push((
                    "content_block_delta",
                    StreamEvent::ContentBlockDelta {
                        index,
                        delta: Delta { kind: "thinking_delta".to_string(), text: None, partial_json: None, thinking: Some(chunk.to_string()), signature: None },
                    },
                ));
            }
            if let Some(signature) = signature {
                events.push((
                    "content_block_delta",
                    StreamEvent::ContentBlockDelta {
                        index,
                        delta: Delta { kind: "signature_delta".to_string(), text: None, partial_json: None, thinking: None, signature: Some(signature.clone()) },
                    },
                ));
            }
            events.push(("content_block_stop", StreamEvent::ContentBlockStop { index }));
        }
        ContentBlock::ToolUse { id, name, input, cache_control, unknown_fields } => {
            events.push((
                "content_block_start",
                StreamEvent::ContentBlockStart {
                    index,
                    content_block: ContentBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: serde_json::Value::Object(Default::default()),
                        cache_control: cache_control.clone(),
                        unknown_fields: unknown_fields.clone(),
                    },
                },
            ));
            let serialized = serde_json::to_string(input).unwrap_or_default();
            for chunk in chunk_text(&serialized) {
                events.push((
                    "content_block_delta",
                    StreamEvent::ContentBlockDelta {
                        index,
                        delta: Delta { kind: "input_json_delta".to_string(), text: None, partial_json: Some(chunk.to_string()), thinking: None, signature: None },
                    },
                ));
            }
            events.push(("content_block_stop", StreamEvent::ContentBlockStop { index }));
        }
        // RedactedThinking, ToolResult, Image and Unknown blocks never arise
        // in an assistant streaming response; carried through whole for
        // forward compatibility rather than split into fabricated deltas.
        other => {
            events.push(("content_block_start", StreamEvent::ContentBlockStart { index, content_block: other.clone() }));
            events.push(("content_block_stop", StreamEvent::ContentBlockStop { index }));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn text_message(text: &str) -> ResponseMessage {
        ResponseMessage {
            id: "msg_1".into(),
            kind: "message".into(),
            role: "assistant".into(),
            content: vec![ContentBlock::Text { text: text.to_string(), cache_control: None, unknown_fields: Default::default() }],
            model: "claude-x".into(),
            stop_reason: Some("end_turn".into()),
            stop_sequence: None,
            usage: Usage { input_tokens: 12, output_tokens: 9, ..Default::default() },
            unknown_fields: Default::default(),
        }
    }

    #[test]
    fn reassembled_deltas_concatenate_back_to_the_original_text() {
        let message = text_message("the quick brown fox jumps over the lazy dog, repeated a few times to force multiple chunks");
        let events = synthesize_response_events(&message);

        let mut reassembled = String::new();
        for (event_type, event) in &events {
            if *event_type == "content_block_delta" {
                if let StreamEvent::ContentBlockDelta { delta, .. } = event {
                    reassembled.push_str(delta.text.as_deref().unwrap_or_default());
                }
            }
        }
        assert_eq!(reassembled, "the quick brown fox jumps over the lazy dog, repeated a few times to force multiple chunks");
    }

    #[test]
    fn event_sequence_starts_and_ends_correctly() {
        let message = text_message("hi");
        let events = synthesize_response_events(&message);
        assert_eq!(events.first().unwrap().0, "message_start");
        assert_eq!(events.last().unwrap().0, "message_stop");
        assert_eq!(events[events.len() - 2].0, "message_delta");
    }
}
