use std::sync::Arc;

use axum::routing::any;
use axum::Router;

use crate::handler::handle;
use crate::state::ProxyState;

/// Builds the axum router: every path and method is proxied through
/// [`handle`]. cc-dump is a transparent passthrough, not a routed API
/// surface, so there is exactly one route.
pub fn router(state: Arc<ProxyState>) -> Router<()> {
    Router::new().fallback(any(handle)).with_state(state)
}
