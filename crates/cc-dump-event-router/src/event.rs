use cc_dump_wire::{Request, StreamEvent};

/// One entry in an ordered list of HTTP header name/value pairs. A plain
/// tuple would work just as well; this exists so call sites read as
/// `Header { name, value }` rather than `.0`/`.1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// The C8 boundary type: every event C9 (or C11 in replay) emits and every
/// subscriber consumes. Per logical exchange, events arrive in the fixed
/// order documented on each variant below, with zero or more `ResponseEvent`
/// between `ResponseHeaders` and `ResponseDone` (spec.md §3).
///
/// `sequence` is the request-sequence counter assigned at ingress; every
/// event belonging to the same exchange carries the same value, which is how
/// concurrent exchanges are distinguished downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Ordered request headers, with `authorization` stripped for display —
    /// the original header is still forwarded to upstream by C9, just never
    /// placed on this event.
    RequestHeaders { sequence: u64, headers: Vec<Header> },
    /// The parsed API request body, with the ingress timestamp that the
    /// formatter stamps onto `HeaderBlock`. Carried here (rather than
    /// recomputed downstream) so replayed exchanges reproduce the archived
    /// `startedDateTime` instead of the moment of replay (spec.md §4.4, §4.11;
    /// IDR4 requires the resulting block lists to be equal, not just
    /// equivalent-looking).
    Request { sequence: u64, body: Request, timestamp: String },
    /// Upstream's response status and headers.
    ResponseHeaders { sequence: u64, status: u16, headers: Vec<Header> },
    /// One parsed SSE event from the upstream body. `event_type` mirrors the
    /// SSE `event:` line (when present) or the payload's own `type` tag.
    ResponseEvent { sequence: u64, event_type: String, data: StreamEvent },
    /// Sentinel marking the end of one exchange's response stream.
    ResponseDone { sequence: u64 },
    /// An HTTP-level error returned to the client (e.g. upstream 5xx).
    Error { sequence: u64, status: u16, reason: String },
    /// A transport or parse failure that isn't an HTTP status — connect
    /// refused, malformed SSE framing, JSON that doesn't parse.
    ProxyError { sequence: u64, description: String },
}

impl Event {
    /// The request-sequence counter every event in one exchange shares.
    pub fn sequence(&self) -> u64 {
        match self {
            Event::RequestHeaders { sequence, .. }
            | Event::Request { sequence, .. }
            | Event::ResponseHeaders { sequence, .. }
            | Event::ResponseEvent { sequence, .. }
            | Event::ResponseDone { sequence }
            | Event::Error { sequence, .. }
            | Event::ProxyError { sequence, .. } => *sequence,
        }
    }

    /// A stable string key for logging, matching the wire `type`/kind names
    /// used elsewhere in the workspace (e.g. `StreamEvent::type_tag`).
    pub fn kind(&self) -> &'static str {
        match self {
            Event::RequestHeaders { .. } => "request_headers",
            Event::Request { .. } => "request",
            Event::ResponseHeaders { .. } => "response_headers",
            Event::ResponseEvent { .. } => "response_event",
            Event::ResponseDone { .. } => "response_done",
            Event::Error { .. } => "error",
            Event::ProxyError { .. } => "proxy_error",
        }
    }
}
