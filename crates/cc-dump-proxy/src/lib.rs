//! Proxy front-end (C9): a transparent axum HTTP/SSE proxy. Every request
//! and response byte reaches the client unmodified; a parsed copy of each
//! is emitted onto the event router for display and recording subscribers.
//!
//! Two modes (spec.md §4.9): [`UpstreamMode::Reverse`] forwards everything
//! to a fixed upstream base URL; [`UpstreamMode::Forward`] derives the
//! target per-request from the client's `Host` header.

mod error;
mod handler;
mod headers;
mod router;
mod sse_relay;
mod state;

pub use error::ProxyError;
pub use handler::BODY_LIMIT_BYTES;
pub use router::router;
pub use state::{ProxyState, UpstreamMode};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use cc_dump_event_router::{Event, EventRouter};
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    use super::*;

    async fn spawn_upstream_echo() -> (tokio::task::JoinHandle<()>, url::Url) {
        async fn echo(body: axum::body::Bytes) -> axum::response::Response {
            use axum::response::IntoResponse as _;
            (
                [(http::header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response()
        }

        let app = axum::Router::new().fallback(axum::routing::any(echo));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (handle, url::Url::parse(&format!("http://{addr}/")).unwrap())
    }

    #[tokio::test]
    async fn non_streaming_request_is_forwarded_and_events_emitted_in_order() {
        let (_upstream, upstream_url) = spawn_upstream_echo().await;

        let (event_router, sender) = EventRouter::new(64);
        let handle = event_router.add_queued_subscriber("test", 64);
        std::thread::spawn(move || event_router.run());

        let state = Arc::new(ProxyState::new(UpstreamMode::Reverse(upstream_url), sender, Duration::from_secs(5)));
        let app = router(state);

        let body = serde_json::json!({
            "model": "claude-x",
            "max_tokens": 16,
            "stream": false,
            "messages": [{"role": "user", "content": "hi"}],
        });

        let request = http::Request::builder()
            .method("POST")
            .uri("/v1/messages")
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::AUTHORIZATION, "Bearer secret-token")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        use tower::ServiceExt as _;
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);

        let mut kinds = Vec::new();
        while let Some(event) = handle.recv() {
            let is_last = matches!(event, Event::ResponseDone { .. });
            kinds.push(event.kind());
            if is_last {
                break;
            }
        }

        assert_eq!(kinds, vec!["request_headers", "request", "response_headers", "response_event", "response_done"]);
    }

    #[tokio::test]
    async fn authorization_header_is_stripped_from_the_display_event_but_still_forwarded() {
        let (_upstream, upstream_url) = spawn_upstream_echo().await;
        let (event_router, sender) = EventRouter::new(64);
        let handle = event_router.add_queued_subscriber("test", 64);
        std::thread::spawn(move || event_router.run());

        let state = Arc::new(ProxyState::new(UpstreamMode::Reverse(upstream_url), sender, Duration::from_secs(5)));
        let app = router(state);

        let request = http::Request::builder()
            .method("POST")
            .uri("/v1/messages")
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::AUTHORIZATION, "Bearer secret-token")
            .body(Body::from(b"{}".to_vec()))
            .unwrap();

        use tower::ServiceExt as _;
        let _ = app.oneshot(request).await.unwrap();

        let first = handle.recv().unwrap();
        match first {
            Event::RequestHeaders { headers, .. } => {
                assert!(!headers.iter().any(|h| h.name.eq_ignore_ascii_case("authorization")));
            }
            other => panic!("expected RequestHeaders, got {other:?}"),
        }
    }
}
