//! Applies the router's event stream to the formatter and turn store,
//! combining one exchange's request and response blocks into a single Turn
//! per spec.md's Turn model (one request/response pair per Turn, not two).

use std::collections::HashMap;

use cc_dump_block_ir::{BlockPayload, FormattedBlock};
use cc_dump_event_router::Event;
use cc_dump_formatter::FormatterState;
use cc_dump_turn_store::{TurnHandle, TurnStore};
use cc_dump_wire::{ResponseMessage, StreamEvent};

fn headers_as_pairs(headers: &[cc_dump_event_router::Header]) -> Vec<(String, String)> {
    headers.iter().map(|h| (h.name.clone(), h.value.clone())).collect()
}

/// One exchange's turn-in-progress, tracked between its `RequestHeaders` and
/// terminal event (`ResponseDone`, `Error`, or a pre-`Request` `ProxyError`).
struct OpenExchange {
    handle: TurnHandle,
    request_seen: bool,
}

/// Running counters surfaced in the status line, per SPEC_FULL.md's
/// `event_dropped` supplemented feature.
#[derive(Debug, Default, Clone)]
pub struct TranscriptStatus {
    pub exchange_count: u64,
    pub dropped_events: u64,
    pub last_error: Option<String>,
}

/// Owns the formatter's content-tracker state and the turn store, and is the
/// single point that turns router [`Event`]s into Turns. Lives on the UI
/// thread; nothing else ever mutates it.
pub struct TranscriptState {
    formatter: FormatterState,
    pub turns: TurnStore,
    open: HashMap<u64, OpenExchange>,
    pub status: TranscriptStatus,
}

impl TranscriptState {
    pub fn new(width: usize) -> Self {
        Self {
            formatter: FormatterState::new(),
            turns: TurnStore::new(width),
            open: HashMap::new(),
            status: TranscriptStatus::default(),
        }
    }

    fn push(&mut self, handle: TurnHandle, block: FormattedBlock) {
        self.turns.append_streaming_block(handle, block);
    }

    /// Applies one event, mutating the turn store. Never fails: events this
    /// state doesn't understand for a given exchange (e.g. a response event
    /// arriving for a sequence whose turn was never opened because its
    /// `RequestHeaders` event was dropped upstream by the router's overflow
    /// policy) are silently ignored rather than panicking.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::RequestHeaders { sequence, headers } => {
                let handle = self.turns.begin_streaming_turn();
                self.push(handle, FormattedBlock::new(BlockPayload::HttpHeadersBlock { headers: headers_as_pairs(headers) }));
                self.open.insert(*sequence, OpenExchange { handle, request_seen: false });
            }
            Event::Request { sequence, body, timestamp } => {
                let Some(exchange) = self.open.get_mut(sequence) else { return };
                exchange.request_seen = true;
                let handle = exchange.handle;
                let blocks = cc_dump_formatter::format_request(body, &mut self.formatter, timestamp.clone());
                for block in blocks {
                    self.push(handle, block);
                }
                self.status.exchange_count += 1;
            }
            Event::ResponseHeaders { sequence, status, headers } => {
                let Some(exchange) = self.open.get(sequence) else { return };
                let handle = exchange.handle;
                let mut pairs = vec![("status".to_string(), status.to_string())];
                pairs.extend(headers_as_pairs(headers));
                self.push(handle, FormattedBlock::new(BlockPayload::HttpHeadersBlock { headers: pairs }));
            }
            Event::ResponseEvent { sequence, event_type, data } => {
                let Some(exchange) = self.open.get(sequence) else { return };
                let handle = exchange.handle;
                let blocks = if event_type == "complete_response" {
                    self.format_complete_response(data)
                } else {
                    cc_dump_formatter::format_response_event(data, &mut self.formatter)
                };
                for block in blocks {
                    self.push(handle, block);
                }
            }
            Event::ResponseDone { sequence } => {
                if let Some(exchange) = self.open.remove(sequence) {
                    self.turns.finalize_streaming_turn(exchange.handle);
                }
            }
            Event::Error { sequence, status, reason } => {
                if let Some(exchange) = self.open.remove(sequence) {
                    self.push(exchange.handle, FormattedBlock::new(BlockPayload::ErrorBlock { code: Some(*status), reason: reason.clone() }));
                    self.turns.finalize_streaming_turn(exchange.handle);
                }
                self.status.last_error = Some(reason.clone());
            }
            Event::ProxyError { sequence, description } => {
                if let Some(exchange) = self.open.get(sequence) {
                    let handle = exchange.handle;
                    let request_seen = exchange.request_seen;
                    self.push(handle, FormattedBlock::new(BlockPayload::ProxyErrorBlock { description: description.clone() }));
                    if !request_seen {
                        self.open.remove(sequence);
                        self.turns.finalize_streaming_turn(handle);
                    }
                }
                self.status.last_error = Some(description.clone());
            }
        }
    }

    /// `complete_response`'s data is the raw JSON of a non-streaming
    /// assistant message wrapped in `StreamEvent::Unknown`; reconstitute it
    /// as a typed `ResponseMessage` before handing it to the formatter.
    fn format_complete_response(&mut self, data: &StreamEvent) -> Vec<FormattedBlock> {
        let StreamEvent::Unknown(value) = data else { return Vec::new() };
        match serde_json::from_value::<ResponseMessage>(value.clone()) {
            Ok(message) => cc_dump_formatter::format_complete_response(&message, &mut self.formatter),
            Err(err) => vec![FormattedBlock::new(BlockPayload::ErrorBlock { code: None, reason: format!("unparseable complete response: {err}") })],
        }
    }

    pub fn record_dropped(&mut self, dropped: u64) {
        self.status.dropped_events = dropped;
    }
}

#[cfg(test)]
mod tests {
    use cc_dump_event_router::Header;
    use cc_dump_wire::{ContentBlock, Message, MessageContent, Request, Role, Usage};
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_request() -> Request {
        Request {
            model: "claude-x".into(),
            messages: vec![Message { role: Role::User, content: MessageContent::Text("hi".into()) }],
            max_tokens: 64,
            system: None,
            stream: true,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            metadata: None,
            tools: None,
            tool_choice: None,
            thinking: None,
            unknown_fields: Default::default(),
        }
    }

    #[test]
    fn one_streaming_exchange_becomes_one_turn_with_request_and_response_blocks() {
        let mut state = TranscriptState::new(80);
        state.apply(&Event::RequestHeaders { sequence: 1, headers: vec![Header::new("content-type", "application/json")] });
        state.apply(&Event::Request { sequence: 1, body: sample_request(), timestamp: "t0".into() });
        state.apply(&Event::ResponseHeaders { sequence: 1, status: 200, headers: vec![] });
        state.apply(&Event::ResponseEvent {
            sequence: 1,
            event_type: "message_start".to_string(),
            data: StreamEvent::MessageStart {
                message: cc_dump_wire::StreamMessageStart {
                    id: "msg_1".into(),
                    kind: "message".into(),
                    role: "assistant".into(),
                    model: "claude-x".into(),
                    content: Vec::new(),
                    usage: Usage { input_tokens: 10, ..Default::default() },
                    unknown_fields: Default::default(),
                },
            },
        });
        state.apply(&Event::ResponseEvent {
            sequence: 1,
            event_type: "content_block_delta".to_string(),
            data: StreamEvent::ContentBlockDelta {
                index: 0,
                delta: cc_dump_wire::Delta { kind: "text_delta".into(), text: Some("Hi!".into()), partial_json: None, thinking: None, signature: None },
            },
        });
        state.apply(&Event::ResponseDone { sequence: 1 });

        assert_eq!(state.turns.turn_count(), 1);
        assert_eq!(state.status.exchange_count, 1);
    }

    #[test]
    fn upstream_connect_error_finalizes_the_turn_without_a_response_done() {
        let mut state = TranscriptState::new(80);
        state.apply(&Event::RequestHeaders { sequence: 1, headers: Vec::new() });
        state.apply(&Event::Request { sequence: 1, body: sample_request(), timestamp: "t0".into() });
        state.apply(&Event::Error { sequence: 1, status: 502, reason: "connection refused".into() });

        assert_eq!(state.turns.turn_count(), 1);
        assert_eq!(state.status.last_error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn malformed_request_body_finalizes_immediately_since_no_response_done_will_ever_arrive() {
        let mut state = TranscriptState::new(80);
        state.apply(&Event::RequestHeaders { sequence: 1, headers: Vec::new() });
        state.apply(&Event::ProxyError { sequence: 1, description: "malformed request JSON".into() });

        assert_eq!(state.turns.turn_count(), 1);
        assert!(state.status.last_error.is_some());
    }

    #[test]
    fn complete_response_event_formats_a_non_streaming_reply_into_the_same_turn() {
        let mut state = TranscriptState::new(80);
        state.apply(&Event::RequestHeaders { sequence: 1, headers: Vec::new() });
        state.apply(&Event::Request { sequence: 1, body: Request { stream: false, ..sample_request() }, timestamp: "t0".into() });
        state.apply(&Event::ResponseHeaders { sequence: 1, status: 200, headers: Vec::new() });

        let message = ResponseMessage {
            id: "msg_1".into(),
            kind: "message".into(),
            role: "assistant".into(),
            content: vec![ContentBlock::Text { text: "hello".into(), cache_control: None, unknown_fields: Default::default() }],
            model: "claude-x".into(),
            stop_reason: Some("end_turn".into()),
            stop_sequence: None,
            usage: Usage { input_tokens: 5, output_tokens: 2, ..Default::default() },
            unknown_fields: Default::default(),
        };
        state.apply(&Event::ResponseEvent {
            sequence: 1,
            event_type: "complete_response".to_string(),
            data: StreamEvent::Unknown(serde_json::to_value(&message).unwrap()),
        });
        state.apply(&Event::ResponseDone { sequence: 1 });

        assert_eq!(state.turns.turn_count(), 1);
        assert!(state.turns.total_lines() > 0);
    }
}
