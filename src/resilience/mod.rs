//! Resilience patterns for the Subspace client.
//!
//! Provides the retry policy engine used by the request executor.

pub mod retry;

pub use retry::{RetryDecision, RetryPolicy};
