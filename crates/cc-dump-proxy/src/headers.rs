use std::sync::OnceLock;

use cc_dump_event_router::Header;
use http::header;
use reqwest::RequestBuilder;

/// Hop-by-hop and routing headers that must never be forwarded verbatim to
/// upstream, mirroring the teacher's `insert_proxied_headers_into` allowlist
/// approach but inverted to a denylist since cc-dump forwards whatever the
/// client sent rather than reconstructing a fixed header set.
fn hop_by_hop_header_names() -> &'static [&'static str] {
    static NAMES: OnceLock<Vec<&'static str>> = OnceLock::new();
    NAMES
        .get_or_init(|| {
            let mut names = vec![
                header::CONNECTION.as_str(),
                "keep-alive",
                header::PROXY_AUTHENTICATE.as_str(),
                header::PROXY_AUTHORIZATION.as_str(),
                header::TE.as_str(),
                header::TRAILER.as_str(),
                header::TRANSFER_ENCODING.as_str(),
                header::UPGRADE.as_str(),
                header::HOST.as_str(),
            ];
            names.sort_unstable();
            names
        })
        .as_slice()
}

/// Header names never placed on a `request_headers` event, even though they
/// are still forwarded to upstream unmodified (spec.md §3: "auth stripped"
/// for the display path only).
const SENSITIVE_HEADER_NAMES: [&str; 2] = ["authorization", "x-api-key"];

pub fn insert_proxied_headers_into(mut request: RequestBuilder, headers: &http::HeaderMap) -> RequestBuilder {
    let denylist = hop_by_hop_header_names();
    for (name, value) in headers.iter() {
        if denylist.contains(&name.as_str()) {
            continue;
        }
        request = request.header(name, value);
    }
    request
}

/// Builds the ordered `(name, value)` list for a `request_headers` event,
/// with `authorization`/`x-api-key` stripped. The original header is never
/// touched on the forwarded request — stripping only applies to this event.
pub fn stripped_for_display(headers: &http::HeaderMap) -> Vec<Header> {
    headers
        .iter()
        .filter(|(name, _)| !SENSITIVE_HEADER_NAMES.contains(&name.as_str().to_ascii_lowercase().as_str()))
        .map(|(name, value)| Header::new(name.as_str(), value.to_str().unwrap_or("<non-utf8>")))
        .collect()
}

pub fn to_event_headers(headers: &http::HeaderMap) -> Vec<Header> {
    headers.iter().map(|(name, value)| Header::new(name.as_str(), value.to_str().unwrap_or("<non-utf8>"))).collect()
}
