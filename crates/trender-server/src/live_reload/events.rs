//! Server-sent events endpoint for live reload.
//!
//! Each connection owns a [`Subscription`] for as long as its response body
//! lives, so a disconnected or finished stream always unsubscribes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderName, header};
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};

use super::hub::Subscription;
use crate::state::AppState;

/// Stream hub messages to the client until it disconnects or the server
/// shuts down.
pub(crate) async fn events_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut subscription = Subscription::new(Arc::clone(&state.hub));
    let shutdown = state.shutdown.clone();
    tracing::debug!(listener = ?subscription.id(), "Event stream opened");

    let stream = async_stream::stream! {
        loop {
            let message = tokio::select! {
                message = subscription.recv() => message,
                () = shutdown.cancelled() => None,
            };
            let Some(message) = message else {
                break;
            };
            yield Ok::<_, Infallible>(Event::default().data(&*message));
        }
        tracing::debug!(listener = ?subscription.id(), "Event stream closed");
    };

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(stream),
    )
}
