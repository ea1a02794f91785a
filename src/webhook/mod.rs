//! Mutating admission webhook surface
//!
//! Exposes the defaulting core over HTTP for the Kubernetes API server:
//! - `POST /mutate` - pod admission reviews
//! - `GET /healthz` - liveness probe
//!
//! Handlers share only the immutable [`WebhookState`]; every admission
//! request is stateless and independent, so any number of concurrent
//! requests can run without locking.

pub mod pod;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::normalize::Strategy;
use crate::resources::Defaults;

/// Shared read-only state for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    /// Operator-configured default quantities, parsed once at startup.
    pub defaults: Defaults,
    /// The merge strategy selected at configuration time.
    pub strategy: Strategy,
}

impl WebhookState {
    /// Create the webhook state from startup configuration
    pub fn new(defaults: Defaults, strategy: Strategy) -> Self {
        Self { defaults, strategy }
    }
}

/// Create the webhook router with all endpoints
pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/mutate", post(pod::mutate_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_builds_from_state() {
        let defaults = Defaults::parse("1G", "0.5", "1G", "0.1").unwrap();
        let state = Arc::new(WebhookState::new(defaults, Strategy::PerField));
        let _router = router(state);
    }
}
