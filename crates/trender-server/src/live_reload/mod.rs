//! Live reload: watch sources, re-render, notify browsers.
//!
//! ```text
//! notify ──► ChangeWatcher ──(debounced)──► ReloadOrchestrator ──► render
//!                                                  │
//!                                                  └─(on success)─► NotificationHub
//!                                                                        │
//!                                            GET /events ◄── Subscription ┘
//! ```

mod debouncer;
pub(crate) mod events;
mod hub;
mod orchestrator;
mod watcher;

pub use debouncer::DEFAULT_DEBOUNCE_MS;
pub use hub::{
    DEFAULT_LISTENER_CAPACITY, Listener, ListenerId, NotificationHub, RELOAD_MESSAGE, Subscription,
};
pub use orchestrator::ReloadOrchestrator;
pub use watcher::{ChangeWatcher, RenderCallback, WatchError, WatchHandle, WatchSet};
