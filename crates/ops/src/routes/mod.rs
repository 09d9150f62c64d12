//! HTTP route handlers for the ops server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health              - Health check (registered in main)
//! POST /slack/events        - Events API: URL verification, assistant events
//! POST /slack/interactions  - Interactivity: approval button clicks
//! ```

pub mod slack;

use axum::Router;

use crate::state::AppState;

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new().merge(slack::router())
}
