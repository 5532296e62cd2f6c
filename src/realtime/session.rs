//! Higher-level messaging session over the raw realtime transport.
//!
//! `MessagingSession` subscribes to the full event vocabulary, decodes
//! payloads into the typed structs from [`proto`](crate::realtime::proto),
//! and maintains in-memory presence and typing state for the UI layer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::warn;

use crate::realtime::client::{RealtimeClient, Subscription};
use crate::realtime::proto::{
    ChatMessage, ConversationSummary, ErrorNotice, EventKind, PresenceUpdate, ReadReceipt,
    TypingNotice,
};

/// Typed event emitted by [`MessagingSession::recv`].
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Connected,
    Disconnected { code: u16, reason: String },
    MessageReceived(ChatMessage),
    MessageSent(ChatMessage),
    MessageRead(ReadReceipt),
    TypingStarted(TypingNotice),
    TypingStopped(TypingNotice),
    UserOnline(PresenceUpdate),
    UserOffline(PresenceUpdate),
    ConversationUpdated(ConversationSummary),
    ServerError(ErrorNotice),
}

#[derive(Debug, Default, Deserialize)]
struct CloseInfo {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    reason: String,
}

#[derive(Default)]
struct SessionState {
    online: HashSet<String>,
    typing: HashMap<String, HashSet<String>>,
}

/// Stateful wrapper around a [`RealtimeClient`].
///
/// Attach once per application; dropping the session deregisters every
/// subscription it added while leaving the client and any other subscribers
/// untouched.
pub struct MessagingSession {
    client: RealtimeClient,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    state: Arc<RwLock<SessionState>>,
    subscriptions: Vec<Subscription>,
}

impl MessagingSession {
    /// Subscribes to every event kind on `client` and starts tracking
    /// presence and typing state.
    pub fn attach(client: &RealtimeClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(SessionState::default()));
        let mut subscriptions = Vec::new();

        subscriptions.push(forward(
            client,
            EventKind::MessageReceived,
            tx.clone(),
            SessionEvent::MessageReceived,
        ));
        subscriptions.push(forward(
            client,
            EventKind::MessageSent,
            tx.clone(),
            SessionEvent::MessageSent,
        ));
        subscriptions.push(forward(
            client,
            EventKind::MessageRead,
            tx.clone(),
            SessionEvent::MessageRead,
        ));
        subscriptions.push(forward(
            client,
            EventKind::ConversationUpdated,
            tx.clone(),
            SessionEvent::ConversationUpdated,
        ));
        subscriptions.push(forward(
            client,
            EventKind::Error,
            tx.clone(),
            SessionEvent::ServerError,
        ));

        {
            let tx = tx.clone();
            subscriptions.push(client.on(EventKind::ConnectionEstablished, move |_| {
                let _ = tx.send(SessionEvent::Connected);
            }));
        }
        {
            let tx = tx.clone();
            let state = Arc::clone(&state);
            subscriptions.push(client.on(EventKind::ConnectionLost, move |data| {
                let info: CloseInfo = serde_json::from_value(data.clone()).unwrap_or_default();
                // Presence and typing snapshots are stale once the socket is
                // gone; the server re-announces on reconnect.
                let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
                guard.online.clear();
                guard.typing.clear();
                let _ = tx.send(SessionEvent::Disconnected {
                    code: info.code,
                    reason: info.reason,
                });
            }));
        }
        {
            let tx = tx.clone();
            let state = Arc::clone(&state);
            subscriptions.push(client.on(EventKind::UserOnline, move |data| {
                let Some(update) = decode::<PresenceUpdate>(EventKind::UserOnline, data) else {
                    return;
                };
                state
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .online
                    .insert(update.user_id.clone());
                let _ = tx.send(SessionEvent::UserOnline(update));
            }));
        }
        {
            let tx = tx.clone();
            let state = Arc::clone(&state);
            subscriptions.push(client.on(EventKind::UserOffline, move |data| {
                let Some(update) = decode::<PresenceUpdate>(EventKind::UserOffline, data) else {
                    return;
                };
                state
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .online
                    .remove(&update.user_id);
                let _ = tx.send(SessionEvent::UserOffline(update));
            }));
        }
        {
            let tx = tx.clone();
            let state = Arc::clone(&state);
            subscriptions.push(client.on(EventKind::TypingStart, move |data| {
                let Some(notice) = decode::<TypingNotice>(EventKind::TypingStart, data) else {
                    return;
                };
                state
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .typing
                    .entry(notice.conversation_id.clone())
                    .or_default()
                    .insert(notice.user_id.clone());
                let _ = tx.send(SessionEvent::TypingStarted(notice));
            }));
        }
        {
            let tx = tx.clone();
            let state = Arc::clone(&state);
            subscriptions.push(client.on(EventKind::TypingStop, move |data| {
                let Some(notice) = decode::<TypingNotice>(EventKind::TypingStop, data) else {
                    return;
                };
                let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
                if let Some(users) = guard.typing.get_mut(&notice.conversation_id) {
                    users.remove(&notice.user_id);
                    if users.is_empty() {
                        guard.typing.remove(&notice.conversation_id);
                    }
                }
                let _ = tx.send(SessionEvent::TypingStopped(notice));
            }));
        }

        Self {
            client: client.clone(),
            events: rx,
            state,
            subscriptions,
        }
    }

    /// Receives the next typed session event.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Users currently known to be online.
    pub fn online_users(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .online
            .iter()
            .cloned()
            .collect()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .online
            .contains(user_id)
    }

    /// Users currently typing in a conversation.
    pub fn typing_users(&self, conversation_id: &str) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .typing
            .get(conversation_id)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Sends a chat message to a conversation.
    pub fn send_message(&self, conversation_id: &str, body: &str) {
        self.client.send(
            EventKind::MessageSent,
            json!({ "body": body }),
            Some(conversation_id.to_string()),
        );
    }

    /// Announces that the local user started typing.
    pub fn start_typing(&self, conversation_id: &str) {
        self.client.send(
            EventKind::TypingStart,
            json!({}),
            Some(conversation_id.to_string()),
        );
    }

    /// Announces that the local user stopped typing.
    pub fn stop_typing(&self, conversation_id: &str) {
        self.client.send(
            EventKind::TypingStop,
            json!({}),
            Some(conversation_id.to_string()),
        );
    }

    /// Reports a message as read.
    pub fn mark_read(&self, conversation_id: &str, message_id: &str) {
        self.client.send(
            EventKind::MessageRead,
            json!({ "messageId": message_id }),
            Some(conversation_id.to_string()),
        );
    }

    /// Deregisters every subscription this session added.
    pub fn detach(mut self) {
        self.remove_subscriptions();
    }

    fn remove_subscriptions(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            self.client.off(subscription);
        }
    }
}

impl Drop for MessagingSession {
    fn drop(&mut self) {
        self.remove_subscriptions();
    }
}

/// Registers a forwarding subscriber that decodes `data` into `T`.
///
/// Payloads that fail to decode are logged and dropped, matching the
/// transport's treatment of malformed frames.
fn forward<T, F>(
    client: &RealtimeClient,
    kind: EventKind,
    tx: mpsc::UnboundedSender<SessionEvent>,
    map: F,
) -> Subscription
where
    T: DeserializeOwned,
    F: Fn(T) -> SessionEvent + Send + Sync + 'static,
{
    client.on(kind, move |data| {
        if let Some(payload) = decode::<T>(kind, data) {
            let _ = tx.send(map(payload));
        }
    })
}

fn decode<T: DeserializeOwned>(kind: EventKind, data: &serde_json::Value) -> Option<T> {
    match serde_json::from_value(data.clone()) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(event = "session_payload_decode_failed", kind = %kind, error = %err);
            None
        }
    }
}
