use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use cc_dump_event_router::Event;
use futures_util::StreamExt as _;
use http::{header, StatusCode};

use crate::headers::{insert_proxied_headers_into, stripped_for_display, to_event_headers};
use crate::sse_relay::{spawn_sse_relay, tee};
use crate::state::ProxyState;

/// Request bodies above this size are rejected before being buffered,
/// matching the Anthropic API's own limit (spec.md treats this as an
/// ambient proxy concern, not something upstream should ever need to
/// enforce on cc-dump's behalf).
pub const BODY_LIMIT_BYTES: usize = 32 << 20;

/// The ingress timestamp stamped onto a request's `HeaderBlock`. Computed
/// once per exchange, here rather than downstream in the formatter, so a
/// replayed exchange can substitute the archive's `startedDateTime` instead
/// (see `cc-dump-replayer`).
fn ingress_timestamp() -> String {
    jiff::Zoned::now().with_time_zone(jiff::tz::TimeZone::UTC).strftime("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn bad_gateway(message: impl Into<String>) -> Response {
    (StatusCode::BAD_GATEWAY, message.into()).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

/// The single passthrough handler: intercepts every request and response
/// byte-for-byte while emitting the parsed event sequence documented in
/// spec.md §3 (`request_headers → request → response_headers →
/// response_event* → response_done`), in that order, for every exchange.
pub async fn handle(State(state): State<Arc<ProxyState>>, request: Request) -> Response {
    let sequence = state.next_sequence();
    let (parts, body) = request.into_parts();

    state.events.send(Event::RequestHeaders { sequence, headers: stripped_for_display(&parts.headers) });

    let body_bytes = match axum::body::to_bytes(body, BODY_LIMIT_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            state.events.send(Event::ProxyError { sequence, description: format!("failed to read request body: {err}") });
            return bad_request(format!("failed to read request body: {err}"));
        }
    };

    match serde_json::from_slice::<cc_dump_wire::Request>(&body_bytes) {
        Ok(parsed_body) => state.events.send(Event::Request { sequence, body: parsed_body, timestamp: ingress_timestamp() }),
        Err(err) => {
            log::warn!("request body did not parse as a Messages API request: {err}");
            state.events.send(Event::ProxyError { sequence, description: format!("malformed request JSON: {err}") });
        }
    }

    let host_header = parts.headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let target = match state.resolve_upstream(parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/"), host_header) {
        Ok(url) => url,
        Err(err) => {
            state.events.send(Event::ProxyError { sequence, description: err.to_string() });
            return bad_gateway(err.to_string());
        }
    };

    let upstream_request = insert_proxied_headers_into(state.client.request(parts.method.clone(), target), &parts.headers)
        .header(header::CONTENT_LENGTH, body_bytes.len())
        .body(body_bytes);

    let upstream_response = match upstream_request.send().await {
        Ok(response) => response,
        Err(err) => {
            log::error!("could not connect to upstream: {err}");
            state.events.send(Event::Error { sequence, status: 502, reason: err.to_string() });
            return bad_gateway("could not connect to upstream");
        }
    };

    let status = upstream_response.status();
    let response_headers = upstream_response.headers().clone();
    state.events.send(Event::ResponseHeaders {
        sequence,
        status: status.as_u16(),
        headers: to_event_headers(&response_headers),
    });

    let is_event_stream = response_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream"));

    let mut builder = axum::http::Response::builder().status(status);
    for (name, value) in response_headers.iter() {
        builder = builder.header(name, value);
    }

    if is_event_stream {
        let (client_stream, parse_stream) = tee(upstream_response.bytes_stream());
        spawn_sse_relay(parse_stream, state.events.clone(), sequence);
        let body = Body::from_stream(client_stream.map(|item| item.map_err(std::io::Error::other)));
        builder.body(body).unwrap_or_else(|_| internal_error())
    } else {
        let bytes = match upstream_response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                state.events.send(Event::ProxyError { sequence, description: format!("failed to read upstream response: {err}") });
                return bad_gateway("failed to read upstream response");
            }
        };
        // Non-streaming upstream calls carry their whole message in one
        // response body rather than an SSE frame sequence. There is no
        // dedicated event kind for this (spec.md's table assumes
        // streaming, the common case for this client); the body is
        // forwarded as a single synthetic `response_event` carrying the raw
        // JSON, which the formatter recognizes as a complete message rather
        // than a delta (see `cc-dump-formatter::format_complete_response`).
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => state.events.send(Event::ResponseEvent {
                sequence,
                event_type: "complete_response".to_string(),
                data: cc_dump_wire::StreamEvent::Unknown(value),
            }),
            Err(err) => {
                state.events.send(Event::ProxyError { sequence, description: format!("malformed response JSON: {err}") });
            }
        }
        state.events.send(Event::ResponseDone { sequence });
        builder.body(Body::from(bytes)).unwrap_or_else(|_| internal_error())
    }
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "cc-dump proxy failed to build a response").into_response()
}
