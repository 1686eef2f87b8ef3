//! ollama-relay: minimal HTTP relay for a local Ollama server.
//!
//! Exposes a small REST surface for a browser-based chat client and forwards
//! chat requests to a local Ollama instance, either buffered (one complete
//! reply) or streamed token-by-token as a plain-text chunked body.

pub mod config;
pub mod server;
pub mod upstream;
