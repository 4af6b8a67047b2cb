//! Observability infrastructure for the Subspace client.
//!
//! Provides subscriber setup and helpers for keeping secrets out of logs.

pub mod logging;

pub use logging::*;
