//! HTTP request handlers.

pub(crate) mod page;
