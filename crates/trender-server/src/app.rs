//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::live_reload;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let images = ServeDir::new(&state.img_dir);

    Router::new()
        .route("/", get(handlers::page::get_page))
        .route("/events", get(live_reload::events::events_handler))
        .nest_service("/img", images)
        .fallback(handlers::page::get_page)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
