//! Route definitions

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/image/resize/:width/:height/:p1/:p2/:filename",
            get(handlers::images::resize),
        )
        .with_state(state)
}
