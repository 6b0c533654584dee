//! Shared gateway state and the listener entry point.
//!
//! The connection and room tables are the only server-side shared mutable
//! state in this subsystem. Both are mutated only on connect/disconnect,
//! each a single synchronous step under the lock. Locks are never held
//! across an await.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use trackwire_sdk::types::Identity;

use crate::auth::{HmacTokenVerifier, TokenVerifier};
use crate::config::ServerConfig;
use crate::gateway;

/// The one broadcast room every authenticated session joins. Personal
/// `user-<id>` rooms exist alongside it, reserved for targeted delivery.
pub const BROADCAST_ROOM: &str = "issues";

/// Outbound frames queued per connection; a peer that falls further behind
/// than this starts losing frames rather than stalling the relay.
pub(crate) const OUTBOUND_QUEUE: usize = 256;

/// A live authenticated connection.
pub struct ConnectionEntry {
    /// Sender for pushing frames to this client's socket.
    pub tx: mpsc::Sender<String>,
    pub identity: Identity,
    pub joined_at: DateTime<Utc>,
}

/// State shared by all connection handlers.
pub struct SharedState {
    pub config: ServerConfig,
    pub verifier: Arc<dyn TokenVerifier>,
    /// session_id -> live connection
    pub connections: Mutex<HashMap<String, ConnectionEntry>>,
    /// room name -> member session ids
    pub rooms: Mutex<HashMap<String, HashSet<String>>>,
}

impl SharedState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let verifier = Arc::new(HmacTokenVerifier::new(config.auth_secret.clone()));
        Self::with_verifier(config, verifier)
    }

    pub fn with_verifier(config: ServerConfig, verifier: Arc<dyn TokenVerifier>) -> Arc<Self> {
        Arc::new(Self {
            config,
            verifier,
            connections: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
        })
    }

    /// Record a freshly authenticated connection and join its personal room
    /// plus the broadcast room.
    pub fn register(&self, session_id: &str, identity: Identity, tx: mpsc::Sender<String>) {
        let personal = format!("user-{}", identity.id);
        self.connections.lock().unwrap().insert(
            session_id.to_string(),
            ConnectionEntry {
                tx,
                identity,
                joined_at: Utc::now(),
            },
        );
        let mut rooms = self.rooms.lock().unwrap();
        for room in [personal.as_str(), BROADCAST_ROOM] {
            rooms
                .entry(room.to_string())
                .or_default()
                .insert(session_id.to_string());
        }
    }

    /// Drop a connection and all its room memberships. Rooms left empty are
    /// removed entirely.
    pub fn unregister(&self, session_id: &str) {
        self.connections.lock().unwrap().remove(session_id);
        let mut rooms = self.rooms.lock().unwrap();
        for members in rooms.values_mut() {
            members.remove(session_id);
        }
        rooms.retain(|_, members| !members.is_empty());
    }

    /// Session ids currently in a room.
    pub fn room_members(&self, room: &str) -> Vec<String> {
        self.rooms
            .lock()
            .unwrap()
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Identities of everyone currently connected, for the presence roster
    /// replayed to a new connection.
    pub fn online_identities(&self) -> Vec<Identity> {
        self.connections
            .lock()
            .unwrap()
            .values()
            .map(|c| c.identity.clone())
            .collect()
    }
}

pub(crate) fn new_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

pub struct Server {
    config: ServerConfig,
    verifier: Option<Arc<dyn TokenVerifier>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            verifier: None,
        }
    }

    /// Create a server with a custom token verifier (for testing, or when
    /// the auth tier is something other than the shared-secret scheme).
    pub fn with_verifier(config: ServerConfig, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            config,
            verifier: Some(verifier),
        }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        tracing::info!("listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serve on an already-bound listener (tests bind port 0 themselves).
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let state = match self.verifier {
            Some(verifier) => SharedState::with_verifier(self.config, verifier),
            None => SharedState::new(self.config),
        };
        let app = gateway::router(state);
        axum::serve(listener, app).await?;
        Ok(())
    }
}
