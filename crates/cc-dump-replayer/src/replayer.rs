use std::path::Path;

use cc_dump_archive::Entry;
use cc_dump_event_router::{Event, EventSender, Header};
use cc_dump_wire::{Request, ResponseMessage};

use crate::error::ReplayError;
use crate::synth::synthesize_response_events;

fn header_list(entries: &[cc_dump_archive::NameValue]) -> Vec<Header> {
    entries.iter().map(|nv| Header::new(nv.name.clone(), nv.value.clone())).collect()
}

/// Replays one archive entry as the fixed event sequence the proxy would
/// have produced live: `request_headers → request → response_headers →
/// synthesize_sse(complete_message) → response_done` (spec.md §4.11).
fn replay_entry(entry: &Entry, sequence: u64, sender: &EventSender) -> Result<(), ReplayError> {
    sender.send(Event::RequestHeaders { sequence, headers: header_list(&entry.request.headers) });

    let request_text = entry.request.post_data.as_ref().map(|p| p.text.as_str()).unwrap_or("{}");
    let request: Request = serde_json::from_str(request_text)?;
    sender.send(Event::Request { sequence, body: request, timestamp: entry.started_date_time.clone() });

    sender.send(Event::ResponseHeaders { sequence, status: entry.response.status, headers: header_list(&entry.response.headers) });

    let response_text = entry.response.content.text.as_deref().unwrap_or("{}");
    let message: ResponseMessage = serde_json::from_str(response_text)?;
    for (event_type, data) in synthesize_response_events(&message) {
        sender.send(Event::ResponseEvent { sequence, event_type: event_type.to_string(), data });
    }

    sender.send(Event::ResponseDone { sequence });
    Ok(())
}

/// Reads every entry from the archive at `path` and emits its replayed event
/// sequence onto `sender`, starting the sequence counter at
/// `starting_sequence`. Returns the next unused sequence value so a caller
/// chaining into live traffic (`--continue`) knows where to resume counting.
///
/// An entry whose request or response body fails to parse is logged and
/// skipped rather than aborting the whole replay — one corrupted recording
/// shouldn't block replaying the rest of a session.
pub fn replay(path: impl AsRef<Path>, starting_sequence: u64, sender: &EventSender) -> Result<u64, ReplayError> {
    let entries = cc_dump_archive::read_entries(path)?;
    let mut sequence = starting_sequence;
    for entry in &entries {
        if let Err(err) = replay_entry(entry, sequence, sender) {
            log::warn!("skipping unreplayable archive entry at sequence {sequence}: {err}");
        }
        sequence += 1;
    }
    Ok(sequence)
}
