//! Realtime event handler trait.

use super::types::InboundEnvelope;
use async_trait::async_trait;

/// Handler for realtime events
#[async_trait]
pub trait RealtimeHandler: Send + Sync {
    /// Handle one decoded envelope
    async fn on_envelope(&self, envelope: InboundEnvelope);

    /// Called when a connection is established
    async fn on_connect(&self) {}

    /// Called when an established connection ends.
    ///
    /// Failed handshakes during reconnection are not reported, so every
    /// call pairs with an earlier [`RealtimeHandler::on_connect`].
    async fn on_disconnect(&self, reason: Option<&str>) {
        let _ = reason;
    }
}

type EnvelopeFn = Box<dyn Fn(InboundEnvelope) + Send + Sync>;

/// Simple handler using closures
#[derive(Default)]
pub struct FnHandler {
    envelope_fn: Option<EnvelopeFn>,
    connect_fn: Option<Box<dyn Fn() + Send + Sync>>,
    disconnect_fn: Option<Box<dyn Fn(Option<&str>) + Send + Sync>>,
}

impl FnHandler {
    /// Create new function handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Set envelope handler
    pub fn on_envelope<F>(mut self, f: F) -> Self
    where
        F: Fn(InboundEnvelope) + Send + Sync + 'static,
    {
        self.envelope_fn = Some(Box::new(f));
        self
    }

    /// Set connect handler
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.connect_fn = Some(Box::new(f));
        self
    }

    /// Set disconnect handler
    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        self.disconnect_fn = Some(Box::new(f));
        self
    }
}

#[async_trait]
impl RealtimeHandler for FnHandler {
    async fn on_envelope(&self, envelope: InboundEnvelope) {
        if let Some(ref f) = self.envelope_fn {
            f(envelope);
        }
    }

    async fn on_connect(&self) {
        if let Some(ref f) = self.connect_fn {
            f();
        }
    }

    async fn on_disconnect(&self, reason: Option<&str>) {
        if let Some(ref f) = self.disconnect_fn {
            f(reason);
        }
    }
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("has_envelope_fn", &self.envelope_fn.is_some())
            .field("has_connect_fn", &self.connect_fn.is_some())
            .field("has_disconnect_fn", &self.disconnect_fn.is_some())
            .finish()
    }
}
