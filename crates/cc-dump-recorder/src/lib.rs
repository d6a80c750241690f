//! Session recorder (C10): consumes the event stream and writes a complete,
//! non-streaming reconstruction of every exchange to an HTTP Archive file
//! (spec.md §4.10). Runs as its own queued subscriber on the event router —
//! a slow disk never backpressures the proxy or the display.

mod accumulator;
mod recorder;

pub use recorder::SessionRecorder;

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use cc_dump_event_router::{Event, Header};
    use cc_dump_wire::{ContentBlock, Delta, MessageDelta, Request, StreamEvent, StreamMessageStart, Usage};
    use pretty_assertions::assert_eq;

    use super::*;

    struct TempPath(PathBuf);

    impl TempPath {
        fn new(name: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("cc-dump-recorder-test-{name}-{:?}", std::thread::current().id()));
            Self(path)
        }
    }

    impl Drop for TempPath {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn sample_request() -> Request {
        serde_json::from_value(serde_json::json!({
            "model": "claude-x",
            "max_tokens": 32,
            "stream": true,
            "messages": [{"role": "user", "content": "hi"}],
        }))
        .unwrap()
    }

    #[test]
    fn records_one_streaming_exchange_as_a_single_archive_entry() {
        let temp = TempPath::new("basic");
        let mut recorder = SessionRecorder::create(&temp.0).unwrap();

        recorder.handle(&Event::RequestHeaders { sequence: 1, headers: vec![Header::new("content-type", "application/json")] });
        recorder.handle(&Event::Request { sequence: 1, body: sample_request(), timestamp: "t0".into() });
        recorder.handle(&Event::ResponseHeaders { sequence: 1, status: 200, headers: vec![Header::new("content-type", "text/event-stream")] });

        let message_start = StreamMessageStart {
            id: "msg_1".into(),
            kind: "message".into(),
            role: "assistant".into(),
            model: "claude-x".into(),
            content: Vec::new(),
            usage: Usage { input_tokens: 10, ..Default::default() },
            unknown_fields: Default::default(),
        };
        recorder.handle(&Event::ResponseEvent { sequence: 1, event_type: "message_start".into(), data: StreamEvent::MessageStart { message: message_start } });
        recorder.handle(&Event::ResponseEvent {
            sequence: 1,
            event_type: "content_block_start".into(),
            data: StreamEvent::ContentBlockStart { index: 0, content_block: ContentBlock::Text { text: String::new(), cache_control: None, unknown_fields: Default::default() } },
        });
        recorder.handle(&Event::ResponseEvent {
            sequence: 1,
            event_type: "content_block_delta".into(),
            data: StreamEvent::ContentBlockDelta { index: 0, delta: Delta { kind: "text_delta".into(), text: Some("hello".into()), partial_json: None, thinking: None, signature: None } },
        });
        recorder.handle(&Event::ResponseEvent {
            sequence: 1,
            event_type: "message_delta".into(),
            data: StreamEvent::MessageDelta { delta: MessageDelta { stop_reason: Some("end_turn".into()), stop_sequence: None }, usage: Usage { output_tokens: 3, ..Default::default() } },
        });
        recorder.handle(&Event::ResponseDone { sequence: 1 });

        assert_eq!(recorder.entries_written(), 1);
        assert!(!recorder.is_disabled());
        recorder.finalize().unwrap();

        let entries = cc_dump_archive::read_entries(&temp.0).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].request.post_data.as_ref().unwrap().text.contains("\"stream\":false"));
        assert!(entries[0].response.content.text.as_ref().unwrap().contains("hello"));
    }

    #[test]
    fn concurrent_sequences_do_not_interleave() {
        let temp = TempPath::new("concurrent");
        let mut recorder = SessionRecorder::create(&temp.0).unwrap();

        for sequence in [1u64, 2u64] {
            recorder.handle(&Event::RequestHeaders { sequence, headers: Vec::new() });
            recorder.handle(&Event::Request { sequence, body: sample_request(), timestamp: "t0".into() });
            recorder.handle(&Event::ResponseHeaders { sequence, status: 200, headers: Vec::new() });
        }

        for sequence in [2u64, 1u64] {
            let message_start = StreamMessageStart {
                id: format!("msg_{sequence}"),
                kind: "message".into(),
                role: "assistant".into(),
                model: "claude-x".into(),
                content: Vec::new(),
                usage: Usage::default(),
                unknown_fields: Default::default(),
            };
            recorder.handle(&Event::ResponseEvent { sequence, event_type: "message_start".into(), data: StreamEvent::MessageStart { message: message_start } });
            recorder.handle(&Event::ResponseDone { sequence });
        }

        assert_eq!(recorder.entries_written(), 2);
        recorder.finalize().unwrap();

        let entries = cc_dump_archive::read_entries(&temp.0).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.response.content.text.clone().unwrap()).collect();
        assert!(ids[0].contains("msg_2"));
        assert!(ids[1].contains("msg_1"));
    }
}
