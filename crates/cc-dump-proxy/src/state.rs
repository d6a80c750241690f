use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cc_dump_event_router::EventSender;
use reqwest::{Client, Url};

use crate::error::ProxyError;

/// Reverse-proxy mode forwards every request to a fixed upstream base URL;
/// forward-proxy mode derives the target per-request from the client's
/// `Host` header (spec.md §4.9's two proxy modes).
#[derive(Debug, Clone)]
pub enum UpstreamMode {
    Reverse(Url),
    Forward,
}

pub struct ProxyState {
    pub mode: UpstreamMode,
    pub client: Client,
    pub events: EventSender,
    sequence: AtomicU64,
}

impl ProxyState {
    pub fn new(mode: UpstreamMode, events: EventSender, read_timeout: Duration) -> Self {
        Self::with_starting_sequence(mode, events, read_timeout, 1)
    }

    /// Like [`Self::new`], but the sequence counter starts at `starting_sequence`
    /// instead of 1 — used by `--continue` so live exchanges' correlation ids
    /// follow on from the ones a replayed archive already emitted, rather than
    /// colliding with them.
    pub fn with_starting_sequence(mode: UpstreamMode, events: EventSender, read_timeout: Duration, starting_sequence: u64) -> Self {
        let client = Client::builder().timeout(read_timeout).build().expect("reqwest client config is always valid here");
        Self { mode, client, events, sequence: AtomicU64::new(starting_sequence) }
    }

    /// Assigns the next request-sequence counter (spec.md §3's correlation
    /// id), monotonically increasing and unique per exchange for this
    /// process's lifetime.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Resolves the absolute upstream URL for one request.
    pub fn resolve_upstream(&self, path_and_query: &str, host_header: Option<&str>) -> Result<Url, ProxyError> {
        let path = path_and_query.trim_start_matches('/');
        match &self.mode {
            UpstreamMode::Reverse(base) => {
                base.join(path).map_err(|err| ProxyError::NoUpstreamTarget(format!("invalid path {path_and_query:?}: {err}")))
            }
            UpstreamMode::Forward => {
                let host = host_header
                    .ok_or_else(|| ProxyError::NoUpstreamTarget("forward-proxy mode requires a Host header".to_string()))?;
                Url::parse(&format!("https://{host}/{path}"))
                    .map_err(|err| ProxyError::NoUpstreamTarget(format!("invalid host {host:?}: {err}")))
            }
        }
    }
}
