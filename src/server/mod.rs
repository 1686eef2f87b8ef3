//! HTTP surface of the relay.
//!
//! - [`chat_api`]: routes and request handlers (the request gateway)
//! - [`streaming`]: upstream NDJSON to plain-text chunk translation

pub mod chat_api;
pub mod streaming;
