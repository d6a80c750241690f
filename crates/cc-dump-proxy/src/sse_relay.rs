use axum::body::Bytes;
use cc_dump_event_router::{Event, EventSender};
use eventsource_stream::Eventsource as _;
use futures_util::{Stream, StreamExt as _};

/// Splits one upstream byte stream into two independent consumers: the
/// bytes returned here are forwarded to the client byte-for-byte
/// unmodified (spec.md §4.9's "client receives exactly the upstream
/// bytes"), while a clone of every chunk is pushed onto an unbounded
/// channel for [`spawn_sse_relay`] to parse on its own task — so a slow or
/// panicking parser can never stall the bytes reaching the client.
pub fn tee(
    upstream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> (impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static, impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let client_stream = upstream.map(move |item| {
        if let Ok(bytes) = &item {
            let _ = tx.send(Ok(bytes.clone()));
        }
        item
    });
    let parse_stream = futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
    (client_stream, parse_stream)
}

/// Parses one tee'd byte stream as SSE and emits `response_event` per frame,
/// `proxy_error` for any parse/framing failure, and `response_done` once the
/// stream ends — whatever its outcome, this task must complete and emit
/// `response_done` exactly once (spec.md §3's ordering invariant).
pub async fn relay(parse_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static, events: EventSender, sequence: u64) {
    let mut stream = Box::pin(parse_stream.eventsource());
    while let Some(item) = stream.next().await {
        match item {
            Ok(frame) => match sonic_rs::from_str::<cc_dump_wire::StreamEvent>(&frame.data) {
                Ok(data) => {
                    let event_type = if frame.event.is_empty() { data.type_tag().to_string() } else { frame.event.clone() };
                    events.send(Event::ResponseEvent { sequence, event_type, data });
                }
                Err(err) => {
                    log::error!("malformed SSE payload from upstream: {err}");
                    events.send(Event::ProxyError { sequence, description: format!("malformed SSE payload: {err}") });
                }
            },
            Err(err) => {
                log::error!("SSE framing error from upstream: {err}");
                events.send(Event::ProxyError { sequence, description: format!("SSE framing error: {err}") });
            }
        }
    }
    events.send(Event::ResponseDone { sequence });
}

pub fn spawn_sse_relay(parse_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static, events: EventSender, sequence: u64) {
    tokio::spawn(relay(parse_stream, events, sequence));
}
