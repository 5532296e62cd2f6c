//! Realtime websocket transport: connection lifecycle, subscriber fan-out,
//! and reconnection with bounded exponential backoff.
//!
//! A [`RealtimeClient`] spawns one background worker that owns the socket
//! exclusively. Inbound frames are dispatched synchronously to per-kind
//! subscriber lists; the subscriber registry outlives reconnects. Failures
//! never surface as errors to callers; they degrade to a log line plus an
//! `error` / `connection_lost` event, and reconnection is the only recovery
//! path for lost connectivity.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::realtime::proto::{Envelope, EventKind};

/// Production websocket endpoint for the realtime service.
pub const REALTIME_ENDPOINT: &str = "wss://realtime.worklane.io/v1/ws";
/// Local development websocket endpoint for the realtime service.
pub const LOCAL_REALTIME_ENDPOINT: &str = "ws://localhost:8081/v1/ws";
/// Environment variable overriding the realtime endpoint.
pub const REALTIME_ENDPOINT_ENV: &str = "WORKLANE_REALTIME_URL";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Callback = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Lifecycle state of the single realtime connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Reconnect schedule applied after an unclean close.
///
/// The n-th scheduled attempt (attempts incremented before computing) waits
/// `base_delay * 2^(n-1)`. There is deliberately no jitter and no delay cap;
/// only `max_attempts` bounds the total retry duration.
#[derive(Clone, Copy, Debug)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,
    /// Attempt ceiling; once exceeded the connection stays down until a
    /// manual `connect()`.
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Delay to wait before the given attempt (1-based, post-increment).
    pub fn delay_after(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

/// Endpoint and reconnect configuration for [`RealtimeClient`].
#[derive(Clone, Debug)]
pub struct RealtimeConfig {
    pub endpoint: String,
    pub reconnect: ReconnectPolicy,
}

impl RealtimeConfig {
    /// Production endpoint with the default reconnect schedule.
    pub fn new() -> Self {
        Self {
            endpoint: REALTIME_ENDPOINT.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Local development endpoint.
    pub fn local() -> Self {
        Self::new().with_endpoint(LOCAL_REALTIME_ENDPOINT)
    }

    /// Production endpoint unless `WORKLANE_REALTIME_URL` is set.
    pub fn from_env() -> Self {
        match std::env::var(REALTIME_ENDPOINT_ENV) {
            Ok(endpoint) if !endpoint.trim().is_empty() => Self::new().with_endpoint(endpoint),
            _ => Self::new(),
        }
    }

    /// Sets an explicit websocket endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end().to_string();
        self
    }

    /// Sets the reconnect schedule.
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`RealtimeClient::on`]; pass it to `off` to remove the
/// exact callback it registered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<EventKind, Vec<(u64, Callback)>>,
}

impl Registry {
    fn add(&mut self, kind: EventKind, callback: Callback) -> Subscription {
        self.next_id += 1;
        let id = self.next_id;
        self.subscribers.entry(kind).or_default().push((id, callback));
        Subscription { kind, id }
    }

    fn remove(&mut self, subscription: &Subscription) {
        if let Some(list) = self.subscribers.get_mut(&subscription.kind) {
            list.retain(|(id, _)| *id != subscription.id);
        }
    }

    fn callbacks_for(&self, kind: EventKind) -> Vec<Callback> {
        self.subscribers
            .get(&kind)
            .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }
}

/// State shared between the client handle and the connection worker.
struct Shared {
    registry: RwLock<Registry>,
    state: RwLock<ConnectionState>,
    last_error: RwLock<Option<String>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            state: RwLock::new(ConnectionState::Disconnected),
            last_error: RwLock::new(None),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn record_error(&self, message: String) {
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    fn clear_error(&self) {
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Fans an event out to every subscriber registered for `kind`.
    ///
    /// Callbacks are cloned out of the registry before invocation so a
    /// callback may call `on`/`off` without deadlocking, and each one runs
    /// under `catch_unwind` so a panicking subscriber cannot starve the rest.
    fn dispatch(&self, kind: EventKind, data: &Value) {
        let callbacks = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks_for(kind);

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(data))).is_err() {
                warn!(event = "subscriber_panicked", kind = %kind);
            }
        }
    }

    /// Parses and dispatches one inbound text frame.
    ///
    /// Malformed JSON and unknown event types are logged and dropped; neither
    /// reaches subscribers.
    fn dispatch_text(&self, text: &str) {
        let envelope = match Envelope::from_text(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(event = "malformed_frame", error = %err);
                return;
            }
        };

        match EventKind::parse(&envelope.kind) {
            Some(kind) => self.dispatch(kind, &envelope.data),
            None => warn!(event = "unknown_event_type", kind = %envelope.kind),
        }
    }
}

struct Lifecycle {
    outbound: mpsc::UnboundedSender<Envelope>,
    shutdown: watch::Sender<bool>,
}

struct ClientInner {
    config: RealtimeConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Option<Lifecycle>>,
}

/// Client handle for the realtime connection.
///
/// Cloning is cheap and every clone refers to the same underlying
/// connection; construct one instance at application start and share it.
/// `on`/`off`/`send` may be called from any task, while `connect` and
/// `disconnect` are expected from a single lifecycle owner.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

impl RealtimeClient {
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                shared: Arc::new(Shared::new()),
                lifecycle: Mutex::new(None),
            }),
        }
    }

    /// Current lifecycle state of the connection.
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.state()
    }

    /// Most recent transport error message, for UI display.
    ///
    /// Cleared on every successful connect.
    pub fn last_error(&self) -> Option<String> {
        self.inner
            .shared
            .last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Opens the realtime connection with the given bearer token.
    ///
    /// No-op with a warning unless currently disconnected. Must be called
    /// from within a tokio runtime; the connection is owned by a spawned
    /// worker task. Connection failures are reported through the `error`
    /// event and [`last_error`](Self::last_error), never to this caller.
    pub fn connect(&self, token: SecretString) {
        let mut lifecycle = self
            .inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let state = self.inner.shared.state();
        if state != ConnectionState::Disconnected {
            warn!(event = "connect_ignored", state = ?state);
            return;
        }

        // A previous worker may have ended on its own (attempt ceiling hit);
        // make sure it is gone before starting a new one.
        if let Some(old) = lifecycle.take() {
            let _ = old.shutdown.send(true);
        }

        self.inner.shared.set_state(ConnectionState::Connecting);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::clone(&self.inner.shared);
        let endpoint = self.inner.config.endpoint.clone();
        let policy = self.inner.config.reconnect;

        tokio::spawn(async move {
            connection_worker(shared, endpoint, token, policy, outbound_rx, shutdown_rx).await;
        });

        *lifecycle = Some(Lifecycle {
            outbound: outbound_tx,
            shutdown: shutdown_tx,
        });
    }

    /// Opens the connection with a token sourced from `provider`.
    ///
    /// When no token is available the call is a no-op with a warning.
    pub fn connect_with(&self, provider: &dyn TokenProvider) {
        match provider.token() {
            Some(token) => self.connect(token),
            None => warn!(event = "connect_without_token"),
        }
    }

    /// Closes the connection and cancels any pending reconnect.
    ///
    /// Idempotent; safe to call while already disconnected. The worker sends
    /// a normal-closure (1000) frame if the socket is open.
    pub fn disconnect(&self) {
        let mut lifecycle = self
            .inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match lifecycle.take() {
            Some(active) => {
                let _ = active.shutdown.send(true);
                self.inner.shared.set_state(ConnectionState::Disconnected);
            }
            None => debug!(event = "disconnect_noop"),
        }
    }

    /// Sends an event envelope over the open connection.
    ///
    /// While the connection is not open the message is dropped with a
    /// warning: no error, no queuing.
    pub fn send(&self, kind: EventKind, data: Value, conversation_id: Option<String>) {
        if self.state() != ConnectionState::Connected {
            warn!(event = "send_while_disconnected", kind = %kind);
            return;
        }

        let lifecycle = self
            .inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(active) = lifecycle.as_ref() else {
            warn!(event = "send_while_disconnected", kind = %kind);
            return;
        };

        let envelope = Envelope::outbound(kind, data, conversation_id);
        if active.outbound.send(envelope).is_err() {
            warn!(event = "send_queue_closed", kind = %kind);
        }
    }

    /// Registers a callback for one event kind.
    ///
    /// Registrations are additive and survive reconnects.
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner
            .shared
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(kind, Arc::new(callback))
    }

    /// Removes a previously registered callback.
    ///
    /// Removing a subscription that is already gone is a no-op.
    pub fn off(&self, subscription: Subscription) {
        self.inner
            .shared
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&subscription);
    }

    #[cfg(test)]
    pub(crate) fn inject_frame(&self, text: &str) {
        self.inner.shared.dispatch_text(text);
    }
}

impl Default for RealtimeClient {
    fn default() -> Self {
        Self::new(RealtimeConfig::default())
    }
}

enum SessionEnd {
    /// `disconnect()` was called or every client handle was dropped.
    Shutdown,
    /// Server closed with a normal-closure code.
    Clean,
    /// Abnormal closure, transport error, or stream end.
    Unclean,
}

async fn connection_worker(
    shared: Arc<Shared>,
    endpoint: String,
    token: SecretString,
    policy: ReconnectPolicy,
    mut outbound_rx: mpsc::UnboundedReceiver<Envelope>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let url = format!("{}?token={}", endpoint, token.expose_secret());
    let mut attempts: u32 = 0;

    loop {
        if *shutdown_rx.borrow() {
            return;
        }

        shared.set_state(ConnectionState::Connecting);

        let socket = tokio::select! {
            _ = shutdown_rx.changed() => return,
            dialed = connect_async(url.as_str()) => match dialed {
                Ok((socket, _)) => socket,
                Err(err) => {
                    // A failed dial behaves like the browser socket: an error
                    // event followed by an abnormal (1006) closure.
                    warn!(event = "realtime_dial_failed", error = %err);
                    shared.record_error(err.to_string());
                    shared.dispatch(EventKind::Error, &json!({ "message": err.to_string() }));
                    shared.dispatch(
                        EventKind::ConnectionLost,
                        &json!({ "code": 1006u16, "reason": "dial failed" }),
                    );
                    match next_delay(&policy, &mut attempts) {
                        Some(delay) => {
                            if !sleep_or_shutdown(delay, &mut shutdown_rx).await {
                                return;
                            }
                            continue;
                        }
                        None => {
                            shared.set_state(ConnectionState::Disconnected);
                            return;
                        }
                    }
                }
            },
        };

        attempts = 0;
        shared.clear_error();
        shared.set_state(ConnectionState::Connected);
        shared.dispatch(EventKind::ConnectionEstablished, &json!({}));
        debug!(event = "realtime_connected");

        match run_session(&shared, socket, &mut outbound_rx, &mut shutdown_rx).await {
            SessionEnd::Shutdown => return,
            SessionEnd::Clean => {
                shared.set_state(ConnectionState::Disconnected);
                return;
            }
            SessionEnd::Unclean => match next_delay(&policy, &mut attempts) {
                Some(delay) => {
                    shared.set_state(ConnectionState::Connecting);
                    debug!(
                        event = "reconnect_scheduled",
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64
                    );
                    if !sleep_or_shutdown(delay, &mut shutdown_rx).await {
                        return;
                    }
                }
                None => {
                    shared.set_state(ConnectionState::Disconnected);
                    return;
                }
            },
        }
    }
}

/// Increments the attempt counter and returns the backoff delay, or `None`
/// once the attempt ceiling is exceeded.
fn next_delay(policy: &ReconnectPolicy, attempts: &mut u32) -> Option<Duration> {
    *attempts += 1;
    if *attempts > policy.max_attempts {
        warn!(event = "reconnect_exhausted", attempts = *attempts - 1);
        return None;
    }
    Some(policy.delay_after(*attempts))
}

/// Waits out a reconnect delay; returns `false` when shutdown interrupts it.
async fn sleep_or_shutdown(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown_rx.changed() => false,
    }
}

async fn run_session(
    shared: &Shared,
    mut socket: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<Envelope>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SessionEnd {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = socket
                    .close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client disconnect".into(),
                    }))
                    .await;
                shared.dispatch(
                    EventKind::ConnectionLost,
                    &json!({ "code": 1000u16, "reason": "client disconnect" }),
                );
                return SessionEnd::Shutdown;
            }
            maybe_outbound = outbound_rx.recv() => {
                match maybe_outbound {
                    Some(envelope) => {
                        let text = match envelope.to_text() {
                            Ok(text) => text,
                            Err(err) => {
                                warn!(event = "encode_outbound_failed", error = %err);
                                continue;
                            }
                        };
                        if let Err(err) = socket.send(Message::Text(text.into())).await {
                            return fail_session(shared, &err.to_string());
                        }
                    }
                    None => {
                        let _ = socket
                            .close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "client dropped".into(),
                            }))
                            .await;
                        return SessionEnd::Shutdown;
                    }
                }
            }
            maybe_inbound = socket.next() => {
                match maybe_inbound {
                    Some(Ok(Message::Text(text))) => shared.dispatch_text(&text),
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(err) = socket.send(Message::Pong(payload)).await {
                            return fail_session(shared, &err.to_string());
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|frame| (u16::from(frame.code), frame.reason.to_string()))
                            .unwrap_or((1005, String::new()));
                        shared.dispatch(
                            EventKind::ConnectionLost,
                            &json!({ "code": code, "reason": reason }),
                        );
                        return if code == 1000 {
                            SessionEnd::Clean
                        } else {
                            SessionEnd::Unclean
                        };
                    }
                    Some(Ok(other)) => {
                        debug!(event = "ignored_frame", frame = ?other);
                    }
                    Some(Err(err)) => return fail_session(shared, &err.to_string()),
                    None => {
                        shared.dispatch(
                            EventKind::ConnectionLost,
                            &json!({ "code": 1006u16, "reason": "stream ended" }),
                        );
                        return SessionEnd::Unclean;
                    }
                }
            }
        }
    }
}

/// Records a transport error and reports the session as uncleanly closed.
fn fail_session(shared: &Shared, message: &str) -> SessionEnd {
    warn!(event = "realtime_transport_error", error = %message);
    shared.record_error(message.to_string());
    shared.dispatch(EventKind::Error, &json!({ "message": message }));
    shared.dispatch(
        EventKind::ConnectionLost,
        &json!({ "code": 1006u16, "reason": message }),
    );
    SessionEnd::Unclean
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::{
        next_delay, ConnectionState, RealtimeClient, RealtimeConfig, ReconnectPolicy, Shared,
    };
    use crate::realtime::proto::EventKind;

    fn counting_subscriber(shared: &Shared, kind: EventKind) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        shared
            .registry
            .write()
            .expect("registry lock")
            .add(kind, Arc::new(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }));
        count
    }

    #[test]
    fn inbound_frame_reaches_subscriber_exactly_once() {
        let shared = Shared::new();
        let count = counting_subscriber(&shared, EventKind::MessageReceived);

        shared.dispatch_text(r#"{"type":"message_received","data":{"id":"m1"}}"#);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_receives_frame_data() {
        let shared = Shared::new();
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&seen);
        shared
            .registry
            .write()
            .expect("registry lock")
            .add(EventKind::MessageReceived, Arc::new(move |data| {
                *sink.lock().expect("seen lock") = Some(data.clone());
            }));

        shared.dispatch_text(r#"{"type":"message_received","data":{"id":"m1"}}"#);
        assert_eq!(
            seen.lock().expect("seen lock").clone(),
            Some(json!({"id": "m1"}))
        );
    }

    #[test]
    fn removed_subscriber_is_never_invoked() {
        let shared = Shared::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let subscription = shared
            .registry
            .write()
            .expect("registry lock")
            .add(EventKind::TypingStart, Arc::new(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }));

        shared
            .registry
            .write()
            .expect("registry lock")
            .remove(&subscription);
        // Removing the same subscription twice is a no-op.
        shared
            .registry
            .write()
            .expect("registry lock")
            .remove(&subscription);

        shared.dispatch_text(r#"{"type":"typing_start","data":{}}"#);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_frame_is_dropped_without_panic() {
        let shared = Shared::new();
        let count = counting_subscriber(&shared, EventKind::MessageReceived);

        shared.dispatch_text("{not json");
        shared.dispatch_text("");
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_event_type_is_never_delivered() {
        let shared = Shared::new();
        let count = counting_subscriber(&shared, EventKind::MessageReceived);

        shared.dispatch_text(r#"{"type":"invoice_paid","data":{"id":"m1"}}"#);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_subscriber_does_not_starve_the_rest() {
        let shared = Shared::new();
        shared
            .registry
            .write()
            .expect("registry lock")
            .add(EventKind::TypingStart, Arc::new(|_| {
                panic!("subscriber failure");
            }));
        let count = counting_subscriber(&shared, EventKind::TypingStart);

        shared.dispatch_text(r#"{"type":"typing_start","data":{"conversationId":"c1"}}"#);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt_from_base_delay() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_attempts: 5,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(800));
    }

    #[test]
    fn attempt_counter_stops_at_the_ceiling() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(10),
            max_attempts: 2,
        };
        let mut attempts = 0;

        assert_eq!(
            next_delay(&policy, &mut attempts),
            Some(Duration::from_millis(10))
        );
        assert_eq!(attempts, 1);
        assert_eq!(
            next_delay(&policy, &mut attempts),
            Some(Duration::from_millis(20))
        );
        assert_eq!(attempts, 2);
        assert_eq!(next_delay(&policy, &mut attempts), None);
    }

    #[test]
    fn send_while_disconnected_is_a_silent_drop() {
        let client = RealtimeClient::new(RealtimeConfig::default());
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.send(EventKind::MessageSent, json!({"body": "hi"}), None);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn disconnect_without_connection_is_idempotent() {
        let client = RealtimeClient::new(RealtimeConfig::default());
        client.disconnect();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn registry_survives_across_subscribers_on_same_kind() {
        let shared = Shared::new();
        let first = counting_subscriber(&shared, EventKind::UserOnline);
        let second = counting_subscriber(&shared, EventKind::UserOnline);

        shared.dispatch_text(r#"{"type":"user_online","data":{"userId":"u1"}}"#);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
