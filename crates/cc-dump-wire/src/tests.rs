use pretty_assertions::assert_eq;

use crate::content::{ContentBlock, SystemPrompt};
use crate::request::{MessageContent, Request, Role};
use crate::sse::StreamEvent;

#[test]
fn request_round_trips_with_text_system_prompt() {
    let raw = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 256,
        "stream": true,
        "system": "you are a helpful assistant",
        "messages": [
            {"role": "user", "content": [{"type": "text", "text": "hi"}]}
        ]
    });

    let request: Request = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(request.model, "claude-x");
    assert!(request.stream);
    assert_eq!(request.system.as_ref().unwrap().sections(), vec!["you are a helpful assistant"]);
    assert_eq!(request.messages[0].role, Role::User);

    let back = serde_json::to_value(&request).unwrap();
    let reparsed: Request = serde_json::from_value(back).unwrap();
    assert_eq!(request, reparsed);
}

#[test]
fn system_prompt_block_list_sections() {
    let raw = serde_json::json!([
        {"type": "text", "text": "part one"},
        {"type": "text", "text": "part two"}
    ]);
    let system: SystemPrompt = serde_json::from_value(raw).unwrap();
    assert_eq!(system.sections(), vec!["part one", "part two"]);
}

#[test]
fn tool_result_only_message_is_detected() {
    let raw = serde_json::json!([{"type": "tool_result", "tool_use_id": "tu_1", "content": "ok"}]);
    let content: MessageContent = serde_json::from_value(raw).unwrap();
    assert!(content.is_exclusively_tool_results());
}

#[test]
fn unknown_content_block_type_is_preserved() {
    let raw = serde_json::json!({"type": "server_tool_use", "id": "x", "name": "web_search"});
    let block: ContentBlock = serde_json::from_value(raw.clone()).unwrap();
    match &block {
        ContentBlock::Unknown(value) => assert_eq!(value, &raw),
        other => panic!("expected Unknown variant, got {other:?}"),
    }
}

#[test]
fn unrecognized_role_is_preserved_verbatim() {
    let raw = serde_json::json!("system_internal");
    let role: Role = serde_json::from_value(raw).unwrap();
    assert_eq!(role.as_str(), "system_internal");
}

#[test]
fn stream_event_tags_round_trip() {
    let raw = serde_json::json!({
        "type": "content_block_delta",
        "index": 0,
        "delta": {"type": "text_delta", "text": "Hi!"}
    });
    let event: StreamEvent = serde_json::from_value(raw).unwrap();
    assert_eq!(event.type_tag(), "content_block_delta");
    match event {
        StreamEvent::ContentBlockDelta { index, delta } => {
            assert_eq!(index, 0);
            assert_eq!(delta.text.as_deref(), Some("Hi!"));
        }
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn unknown_stream_event_type_falls_back() {
    let raw = serde_json::json!({"type": "citations_delta", "index": 0});
    let event: StreamEvent = serde_json::from_value(raw).unwrap();
    assert_eq!(event.type_tag(), "unknown");
}
