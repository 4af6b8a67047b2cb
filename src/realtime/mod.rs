//! Realtime channel for inbound message events.
//!
//! Provides a WebSocket connection to the backend that decodes inbound
//! envelopes and heals itself after failures.

#[cfg(feature = "realtime")]
mod client;
mod handler;
mod types;

#[cfg(feature = "realtime")]
pub use client::*;
pub use handler::*;
pub use types::*;
