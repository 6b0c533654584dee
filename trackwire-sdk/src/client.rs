//! Realtime client: one WebSocket transport per authenticated session.
//!
//! A [`RealtimeClient`] is session-scoped: construct it at login, call
//! [`RealtimeClient::disconnect`] (or drop it) at logout. It is deliberately
//! not a process-wide singleton; inject it into the views that need it.
//!
//! `emit` is fire-and-forget: no acknowledgement is awaited, because callers
//! only emit after the corresponding REST mutation already succeeded. When
//! the transport is down, emits are silently dropped. This layer makes no
//! delivery guarantees.
//!
//! ## Reconnection
//!
//! The SDK does not implement automatic reconnection. A view that comes back
//! after a drop should call `connect()` again and re-fetch its data; there
//! is no event replay on the server.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, tungstenite};

use crate::error::ClientError;
use crate::event::{ClientEvent, EventKind, ServerEvent};

/// Configuration for dialing the realtime gateway.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Gateway origin, e.g. `ws://127.0.0.1:4600`.
    pub gateway_url: String,
    /// Bearer credential from the REST login flow. `None` means nobody is
    /// logged in; `connect()` refuses to dial without one.
    pub token: Option<String>,
}

type Handler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// One handler per kind; re-subscribing replaces rather than stacks, so a
/// view remount cannot leak stale handlers.
#[derive(Default)]
struct HandlerRegistry {
    handlers: Mutex<HashMap<EventKind, Handler>>,
}

impl HandlerRegistry {
    fn set(&self, kind: EventKind, handler: Handler) {
        self.handlers.lock().insert(kind, handler);
    }

    fn clear(&self, kind: EventKind) {
        self.handlers.lock().remove(&kind);
    }

    fn dispatch(&self, event: &ServerEvent) {
        // Clone out of the lock so a handler may re-subscribe.
        let handler = self.handlers.lock().get(&event.kind()).cloned();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

enum Command {
    Emit(ClientEvent),
    Close,
}

struct ConnectionHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

/// The realtime side of a logged-in session.
pub struct RealtimeClient {
    config: ConnectConfig,
    handlers: Arc<HandlerRegistry>,
    conn: Arc<Mutex<Option<ConnectionHandle>>>,
}

impl RealtimeClient {
    pub fn new(config: ConnectConfig) -> Self {
        Self {
            config,
            handlers: Arc::new(HandlerRegistry::default()),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Establish the transport. Refuses without a credential, maps a 401
    /// handshake to [`ClientError::Rejected`], and is idempotent while a
    /// live transport exists.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let Some(token) = self.config.token.clone() else {
            tracing::debug!("connect() without a credential, staying offline");
            return Err(ClientError::MissingCredential);
        };
        if self.is_connected() {
            return Ok(());
        }

        let url = format!("{}/ws?token={token}", self.config.gateway_url);
        let (ws_stream, _response) = match connect_async(&url).await {
            Ok(ok) => ok,
            Err(tungstenite::Error::Http(resp)) if resp.status().as_u16() == 401 => {
                return Err(ClientError::Rejected);
            }
            Err(e) => return Err(ClientError::Transport(e.to_string())),
        };

        let (mut write, mut read) = ws_stream.split();
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();

        let handlers = self.handlers.clone();
        let mut read_task = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => handlers.dispatch(&event),
                            Err(e) => tracing::warn!("ignoring unparseable frame: {e}"),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("websocket read error: {e}");
                        break;
                    }
                }
            }
        });

        let mut write_task = tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    Command::Emit(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!("failed to serialize {}: {e}", event.kind());
                                continue;
                            }
                        };
                        if write.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Command::Close => break,
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        // Whichever task ends first takes the other down with it, then
        // frees the slot so a later connect() can dial again.
        let conn = self.conn.clone();
        let guard_tx = cmd_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = &mut read_task => write_task.abort(),
                _ = &mut write_task => read_task.abort(),
            }
            let mut slot = conn.lock();
            if slot.as_ref().is_some_and(|h| h.cmd_tx.same_channel(&guard_tx)) {
                slot.take();
            }
        });

        *self.conn.lock() = Some(ConnectionHandle { cmd_tx });
        tracing::info!("realtime session established");
        Ok(())
    }

    /// Tear down the transport. Safe to call when not connected.
    pub fn disconnect(&self) {
        if let Some(handle) = self.conn.lock().take() {
            let _ = handle.cmd_tx.send(Command::Close);
            tracing::info!("realtime session closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn
            .lock()
            .as_ref()
            .is_some_and(|h| !h.cmd_tx.is_closed())
    }

    /// Fire-and-forget emit. Dropped silently when the transport is down.
    pub fn emit(&self, event: ClientEvent) {
        let slot = self.conn.lock();
        match slot.as_ref() {
            Some(handle) => {
                if handle.cmd_tx.send(Command::Emit(event)).is_err() {
                    tracing::debug!("realtime transport gone, dropping event");
                }
            }
            None => tracing::debug!("emit while disconnected, dropping event"),
        }
    }

    /// Register the handler for one event kind, replacing any previous one.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.handlers.set(kind, Arc::new(handler));
    }

    pub fn unsubscribe(&self, kind: EventKind) {
        self.handlers.clear(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn connect_without_credential_creates_no_transport() {
        let client = RealtimeClient::new(ConnectConfig {
            gateway_url: "ws://127.0.0.1:1".to_string(),
            token: None,
        });
        let result = client.connect().await;
        assert!(matches!(result, Err(ClientError::MissingCredential)));
        assert!(!client.is_connected());
    }

    #[test]
    fn disconnect_when_not_connected_is_a_noop() {
        let client = RealtimeClient::new(ConnectConfig {
            gateway_url: "ws://127.0.0.1:1".to_string(),
            token: Some("tok".to_string()),
        });
        client.disconnect();
        client.disconnect();
    }

    #[test]
    fn emit_while_disconnected_drops_silently() {
        let client = RealtimeClient::new(ConnectConfig {
            gateway_url: "ws://127.0.0.1:1".to_string(),
            token: Some("tok".to_string()),
        });
        client.emit(ClientEvent::IssueDeleted { id: 1 });
    }

    #[test]
    fn resubscribe_replaces_previous_handler() {
        let client = RealtimeClient::new(ConnectConfig {
            gateway_url: "ws://127.0.0.1:1".to_string(),
            token: Some("tok".to_string()),
        });

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let c = first.clone();
        client.subscribe(EventKind::PresenceOnline, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let c = second.clone();
        client.subscribe(EventKind::PresenceOnline, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let event = ServerEvent::PresenceOnline {
            user_id: 1,
            user_email: "a@example.com".to_string(),
        };
        client.handlers.dispatch(&event);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        client.unsubscribe(EventKind::PresenceOnline);
        client.handlers.dispatch(&event);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
