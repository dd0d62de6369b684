//! REST endpoint handlers.

pub mod relay;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all relay and system routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(relay::routes())
        .merge(system::routes())
}
