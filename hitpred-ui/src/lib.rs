//! hitpred-ui library interface
//!
//! Browser front end for the prediction service. Form submissions are
//! forwarded to the hitpred-api router in-process; no network hop is made.

pub mod api;
pub mod form;
pub mod render;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct UiState {
    /// hitpred-api router, already bound to its own state
    pub api: Router,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl UiState {
    pub fn new(api: Router) -> Self {
        Self {
            api,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: UiState) -> Router {
    Router::new()
        .merge(api::ui_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
