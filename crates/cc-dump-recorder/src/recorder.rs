use std::collections::HashMap;
use std::time::Instant;

use cc_dump_archive::{started_date_time, Entry, HarRequest, HarResponse, HarWriter, NameValue};
use cc_dump_event_router::{Event, Header};
use cc_dump_wire::Request;

use crate::accumulator::ResponseAccumulator;

fn header_list(headers: &[Header]) -> Vec<NameValue> {
    headers.iter().map(|h| NameValue::new(h.name.clone(), h.value.clone())).collect()
}

struct PendingExchange {
    started_at: Instant,
    started_date_time: String,
    request_headers: Vec<Header>,
    request_body: Option<Request>,
    response_status: Option<u16>,
    response_headers: Vec<Header>,
    accumulator: ResponseAccumulator,
}

impl PendingExchange {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            started_date_time: started_date_time(),
            request_headers: Vec::new(),
            request_body: None,
            response_status: None,
            response_headers: Vec::new(),
            accumulator: ResponseAccumulator::new(),
        }
    }
}

/// Subscriber that reconstructs a synthetic non-streaming response per
/// exchange and writes it to an HTTP Archive file (C10). Buffers are keyed
/// by the event sequence counter so concurrent exchanges never interleave.
///
/// Once a write fails, recording is permanently disabled for the rest of
/// the session (spec.md's archive-write failure policy) — display is
/// unaffected either way since this subscriber never touches C4-C7.
pub struct SessionRecorder {
    writer: Option<HarWriter>,
    pending: HashMap<u64, PendingExchange>,
    disabled: bool,
}

impl SessionRecorder {
    pub fn create(path: impl AsRef<std::path::Path>) -> Result<Self, cc_dump_archive::ArchiveError> {
        let writer = HarWriter::create(path)?;
        Ok(Self { writer: Some(writer), pending: HashMap::new(), disabled: false })
    }

    pub fn entries_written(&self) -> usize {
        self.writer.as_ref().map(|w| w.entry_count()).unwrap_or(0)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Finalizes the archive file. Consumes `self` since no further writes
    /// are possible afterward.
    pub fn finalize(self) -> Result<(), cc_dump_archive::ArchiveError> {
        match self.writer {
            Some(writer) => writer.finalize(),
            None => Ok(()),
        }
    }

    pub fn handle(&mut self, event: &Event) {
        if self.disabled {
            return;
        }
        match event {
            Event::RequestHeaders { sequence, headers } => {
                self.pending.entry(*sequence).or_insert_with(PendingExchange::new).request_headers = headers.clone();
            }
            Event::Request { sequence, body, timestamp } => {
                let entry = self.pending.entry(*sequence).or_insert_with(PendingExchange::new);
                entry.request_body = Some(body.clone());
                // Reuse the exact ingress timestamp the live display stamped
                // onto HeaderBlock, rather than a second independent clock
                // read, so replaying this archive reproduces that same
                // block (spec.md §4.4, §4.11; IDR4).
                entry.started_date_time = timestamp.clone();
            }
            Event::ResponseHeaders { sequence, status, headers } => {
                let entry = self.pending.entry(*sequence).or_insert_with(PendingExchange::new);
                entry.response_status = Some(*status);
                entry.response_headers = headers.clone();
            }
            Event::ResponseEvent { sequence, event_type, data } => {
                if let Some(pending) = self.pending.get_mut(sequence) {
                    if event_type == "complete_response" {
                        if let cc_dump_wire::StreamEvent::Unknown(value) = data {
                            if let Ok(message) = serde_json::from_value::<cc_dump_wire::ResponseMessage>(value.clone()) {
                                pending.accumulator.apply_complete(message);
                            }
                        }
                    } else {
                        pending.accumulator.apply(event_type, data);
                    }
                }
            }
            Event::ResponseDone { sequence } => {
                if let Some(pending) = self.pending.remove(sequence) {
                    self.write_entry(pending);
                }
            }
            Event::Error { .. } | Event::ProxyError { .. } => {}
        }
    }

    fn write_entry(&mut self, pending: PendingExchange) {
        let Some(request_body) = pending.request_body else {
            log::warn!("dropping archive entry: response_done with no parsed request body");
            return;
        };
        let Some(message) = pending.accumulator.finish() else {
            log::warn!("dropping archive entry: response stream produced no message_start");
            return;
        };

        let non_streaming_body = serde_json::to_value(request_body.as_non_streaming()).unwrap_or(serde_json::Value::Null);
        let response_body = serde_json::to_value(&message).unwrap_or(serde_json::Value::Null);

        let entry = Entry {
            started_date_time: pending.started_date_time,
            time: pending.started_at.elapsed().as_secs_f64() * 1000.0,
            request: HarRequest::json("POST", "/v1/messages", header_list(&pending.request_headers), &non_streaming_body),
            response: HarResponse::json(pending.response_status.unwrap_or(200), header_list(&pending.response_headers), &response_body),
        };

        let Some(writer) = self.writer.as_mut() else { return };
        if let Err(err) = writer.append_entry(&entry) {
            log::error!("disabling recording for this session: archive write failed: {err}");
            self.disabled = true;
            self.writer = None;
        }
    }
}

impl cc_dump_event_router::Subscriber for SessionRecorder {
    fn on_event(&mut self, event: &Event) {
        self.handle(event);
    }
}
