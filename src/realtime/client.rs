//! Realtime channel implementation.
//!
//! Keeps one WebSocket open to the realtime endpoint, decodes inbound
//! frames, and re-opens the connection after a fixed delay whenever the
//! receive side fails.

use super::handler::RealtimeHandler;
use super::types::InboundEnvelope;
use crate::config::{ClientConfig, RealtimeConfig};
use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

const SUBSCRIBER_CAPACITY: usize = 256;

/// Connection phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelPhase {
    /// No connection and none in progress
    #[default]
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Connected and receiving
    Connected,
}

/// Observable channel state, written only by the channel itself
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    /// Current phase
    pub phase: ChannelPhase,
    /// Most recent successfully decoded envelope
    pub last_envelope: Option<InboundEnvelope>,
}

impl ChannelState {
    /// Whether the channel is connected
    pub fn is_connected(&self) -> bool {
        self.phase == ChannelPhase::Connected
    }
}

struct Session {
    outbound: mpsc::UnboundedSender<Message>,
    shutdown: watch::Sender<bool>,
}

struct Inner {
    config: RealtimeConfig,
    endpoint: Url,
    state: RwLock<ChannelState>,
    session: Mutex<Option<Session>>,
    identity: Mutex<Option<String>>,
    handler: RwLock<Option<Arc<dyn RealtimeHandler>>>,
    events: broadcast::Sender<InboundEnvelope>,
    // Bumped by every explicit connect and disconnect; stale reconnects compare against it
    generation: AtomicU64,
}

/// Self-healing realtime channel
pub struct RealtimeChannel {
    inner: Arc<Inner>,
}

impl RealtimeChannel {
    /// Create a channel for the given endpoint
    pub fn new(endpoint: Url, config: RealtimeConfig) -> Self {
        let (events, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                endpoint,
                state: RwLock::new(ChannelState::default()),
                session: Mutex::new(None),
                identity: Mutex::new(None),
                handler: RwLock::new(None),
                events,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Create a channel from client configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.websocket_url.clone(), config.realtime.clone())
    }

    /// Register the handler, builder style
    pub fn with_handler(self, handler: Arc<dyn RealtimeHandler>) -> Self {
        self.set_handler(handler);
        self
    }

    /// Register or replace the handler
    pub fn set_handler(&self, handler: Arc<dyn RealtimeHandler>) {
        *self.inner.handler.write() = Some(handler);
    }

    /// Receive every decoded envelope in transport order
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEnvelope> {
        self.inner.events.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ChannelState {
        self.inner.state.read().clone()
    }

    /// Current phase
    pub fn phase(&self) -> ChannelPhase {
        self.inner.state.read().phase
    }

    /// Whether the channel is connected
    pub fn is_connected(&self) -> bool {
        self.inner.state.read().is_connected()
    }

    /// Most recent decoded envelope
    pub fn last_envelope(&self) -> Option<InboundEnvelope> {
        self.inner.state.read().last_envelope.clone()
    }

    /// Identity used by the current or most recent connection
    pub fn identity(&self) -> Option<String> {
        self.inner.identity.lock().clone()
    }

    /// Open the channel for `identity`.
    ///
    /// A no-op while connected or connecting. Handshake failures are
    /// logged and handed to the reconnect loop rather than returned. Any
    /// reconnect already waiting is superseded by this call.
    pub async fn connect(&self, identity: impl Into<String>) {
        let identity = identity.into();

        let generation = {
            let mut state = self.inner.state.write();
            if state.phase != ChannelPhase::Disconnected {
                info!(identity = %identity, "Already connected to realtime channel");
                return;
            }
            state.phase = ChannelPhase::Connecting;
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        *self.inner.identity.lock() = Some(identity.clone());

        Inner::open(self.inner.clone(), identity, generation).await;
    }

    /// Close the channel without reconnecting
    pub async fn disconnect(&self) {
        let session = self.inner.shutdown();

        if let Some(session) = session {
            let _ = session.outbound.send(Message::Close(None));
            let _ = session.shutdown.send(true);
            info!("Disconnected from realtime channel");

            if let Some(handler) = self.inner.current_handler() {
                handler.on_disconnect(None).await;
            }
        }
    }

    /// Queue a text frame. Logs and drops it when not connected.
    pub fn send(&self, text: impl Into<String>) {
        let session = self.inner.session.lock();
        match session.as_ref() {
            Some(session) => {
                if session.outbound.send(Message::Text(text.into())).is_err() {
                    warn!("Realtime writer has stopped; message dropped");
                }
            }
            None => warn!("Cannot send message: not connected"),
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(session) = self.inner.shutdown() {
            let _ = session.outbound.send(Message::Close(None));
            let _ = session.shutdown.send(true);
        }
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("config", &self.inner.config)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Inner {
    fn current_handler(&self) -> Option<Arc<dyn RealtimeHandler>> {
        self.handler.read().clone()
    }

    fn connection_url(&self, identity: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("userId", identity);
        url
    }

    /// Invalidate pending reconnects and detach the live session
    fn shutdown(&self) -> Option<Session> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write();
        state.phase = ChannelPhase::Disconnected;
        self.session.lock().take()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    // Boxed so the reconnect task can spawn it recursively
    fn open(
        inner: Arc<Inner>,
        identity: String,
        generation: u64,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let url = inner.connection_url(&identity);
            debug!(identity = %identity, "Opening realtime channel");

            let handshake =
                tokio::time::timeout(inner.config.connect_timeout, connect_async(url.as_str()))
                    .await;

            let stream = match handshake {
                Ok(Ok((stream, _))) => stream,
                Ok(Err(e)) => {
                    error!(identity = %identity, error = %e, "Realtime handshake failed");
                    Inner::connection_lost(inner, generation, Some(e.to_string())).await;
                    return;
                }
                Err(_) => {
                    error!(identity = %identity, "Realtime handshake timed out");
                    Inner::connection_lost(inner, generation, Some("handshake timed out".into()))
                        .await;
                    return;
                }
            };

            let (write, mut read) = stream.split();
            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            {
                let mut state = inner.state.write();
                if !inner.is_current(generation) || state.phase != ChannelPhase::Connecting {
                    debug!("Realtime channel was closed during the handshake");
                    return;
                }
                state.phase = ChannelPhase::Connected;
                *inner.session.lock() = Some(Session {
                    outbound: outbound_tx.clone(),
                    shutdown: shutdown_tx,
                });
            }

            info!(identity = %identity, "Connected to realtime channel");

            if let Some(handler) = inner.current_handler() {
                handler.on_connect().await;
            }

            tokio::spawn(run_writer(write, outbound_rx));

            // Heartbeat
            let ping_interval = inner.config.ping_interval;
            let mut heartbeat_shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(ping_interval);
                ticker.tick().await;

                loop {
                    tokio::select! {
                        _ = heartbeat_shutdown.changed() => break,
                        _ = ticker.tick() => {
                            if outbound_tx.send(Message::Ping(Vec::new())).is_err() {
                                break;
                            }
                            debug!("Realtime ping queued");
                        }
                    }
                }
            });

            // Receive loop
            let mut receive_shutdown = shutdown_rx;
            tokio::spawn(async move {
                let reason = loop {
                    tokio::select! {
                        _ = receive_shutdown.changed() => {
                            debug!("Realtime receive loop stopped");
                            return;
                        }
                        frame = read.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                inner.dispatch(InboundEnvelope::from_json(&text));
                            }
                            Some(Ok(Message::Binary(bytes))) => {
                                inner.dispatch(InboundEnvelope::from_bytes(&bytes));
                            }
                            Some(Ok(Message::Close(frame))) => {
                                let reason = frame.map(|f| f.reason.to_string());
                                warn!(reason = ?reason, "Realtime channel closed by server");
                                break reason.or_else(|| Some("closed by server".into()));
                            }
                            Some(Ok(_)) => {
                                // Ping/pong frames are answered by tungstenite
                            }
                            Some(Err(e)) => {
                                error!(error = %e, "Realtime receive error");
                                break Some(e.to_string());
                            }
                            None => {
                                warn!("Realtime stream ended");
                                break Some("stream ended".into());
                            }
                        }
                    }
                };

                Inner::connection_lost(inner, generation, reason).await;
            });
        })
    }

    fn dispatch(&self, decoded: Result<InboundEnvelope, super::types::FrameDecodeError>) {
        let envelope = match decoded {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable realtime frame");
                return;
            }
        };

        debug!(envelope_type = envelope.kind(), "Received realtime envelope");
        self.state.write().last_envelope = Some(envelope.clone());
        let _ = self.events.send(envelope.clone());

        if let Some(handler) = self.current_handler() {
            tokio::spawn(async move {
                handler.on_envelope(envelope).await;
            });
        }
    }

    /// Mark the channel down and schedule exactly one reconnect
    async fn connection_lost(inner: Arc<Inner>, generation: u64, reason: Option<String>) {
        let was_connected = {
            let mut state = inner.state.write();
            if !inner.is_current(generation) {
                return;
            }
            state.phase = ChannelPhase::Disconnected;
            match inner.session.lock().take() {
                Some(session) => {
                    let _ = session.shutdown.send(true);
                    true
                }
                None => false,
            }
        };

        // Only sessions that reached Connected are reported
        if was_connected {
            if let Some(handler) = inner.current_handler() {
                handler.on_disconnect(reason.as_deref()).await;
            }
        }

        let delay = inner.config.reconnect_delay;
        info!(delay_ms = delay.as_millis() as u64, "Scheduling realtime reconnect");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if !inner.is_current(generation) {
                return;
            }

            let Some(identity) = inner.identity.lock().clone() else {
                return;
            };

            {
                let mut state = inner.state.write();
                if state.phase != ChannelPhase::Disconnected {
                    return;
                }
                state.phase = ChannelPhase::Connecting;
            }

            info!(identity = %identity, "Reconnecting realtime channel");
            Inner::open(inner, identity, generation).await;
        });
    }
}

/// Drain the outbound queue into the socket until a close frame is written
/// or every sender is gone. Write failures are logged and never end the
/// connection; the receive loop owns failure detection.
async fn run_writer<S>(mut sink: S, mut outbound: mpsc::UnboundedReceiver<Message>)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        let is_ping = matches!(message, Message::Ping(_));

        if let Err(e) = sink.send(message).await {
            if is_ping {
                error!(error = %e, "Realtime ping failed");
            } else {
                error!(error = %e, "Realtime send failed");
            }
        }

        if closing {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite;

    fn channel() -> RealtimeChannel {
        RealtimeChannel::new(
            Url::parse("ws://localhost:8080/ws").unwrap(),
            RealtimeConfig::default(),
        )
    }

    #[test]
    fn test_identity_becomes_query_param() {
        let channel = channel();
        let url = channel.inner.connection_url("user 42");
        assert_eq!(url.as_str(), "ws://localhost:8080/ws?userId=user+42");
    }

    #[test]
    fn test_initial_state() {
        let channel = channel();
        assert_eq!(channel.phase(), ChannelPhase::Disconnected);
        assert!(!channel.is_connected());
        assert!(channel.last_envelope().is_none());
        assert!(channel.identity().is_none());
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_noop() {
        let channel = channel();
        channel.send("hello");
        channel.disconnect().await;
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn test_dispatch_records_last_envelope_and_drops_garbage() {
        let channel = channel();
        let mut events = channel.subscribe();

        channel.inner.dispatch(InboundEnvelope::from_json("{oops"));
        assert!(channel.last_envelope().is_none());

        channel
            .inner
            .dispatch(InboundEnvelope::from_json(r#"{"type":"typing","data":null}"#));
        assert_eq!(channel.last_envelope().unwrap().kind(), "typing");

        let received = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.kind(), "typing");
    }

    #[tokio::test]
    async fn test_writer_survives_failed_ping() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let record = written.clone();
        let sink = Box::pin(futures_util::sink::unfold((), move |(), message: Message| {
            let record = record.clone();
            async move {
                if message.is_ping() {
                    return Err(tungstenite::Error::ConnectionClosed);
                }
                record.lock().push(message);
                Ok(())
            }
        }));

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Message::Ping(Vec::new())).unwrap();
        tx.send(Message::Text("after ping".into())).unwrap();
        tx.send(Message::Close(None)).unwrap();
        tx.send(Message::Text("after close".into())).unwrap();

        tokio::time::timeout(Duration::from_secs(1), run_writer(sink, rx))
            .await
            .unwrap();

        assert_eq!(
            *written.lock(),
            vec![Message::Text("after ping".into()), Message::Close(None)]
        );
    }

    #[tokio::test]
    async fn test_failed_ping_leaves_channel_connected() {
        let channel = channel();
        let generation = channel.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (outbound, _outbound_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        {
            let mut state = channel.inner.state.write();
            state.phase = ChannelPhase::Connected;
            *channel.inner.session.lock() = Some(Session { outbound, shutdown });
        }

        let sink = Box::pin(futures_util::sink::unfold((), |(), _: Message| async {
            Err::<(), _>(tungstenite::Error::ConnectionClosed)
        }));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Message::Ping(Vec::new())).unwrap();
        drop(tx);
        run_writer(sink, rx).await;

        assert!(channel.inner.is_current(generation));
        assert_eq!(channel.phase(), ChannelPhase::Connected);
        assert!(channel.inner.session.lock().is_some());
    }
}
