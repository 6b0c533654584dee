//! The axum router and per-socket connection handler.
//!
//! The credential rides the upgrade request as a `?token=` query parameter
//! and is verified *before* the upgrade completes: a bad token gets a 401
//! and no connection state ever exists. There is no guest mode.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;

use trackwire_sdk::event::{ClientEvent, ServerEvent};
use trackwire_sdk::types::Identity;

use crate::relay;
use crate::server::{BROADCAST_ROOM, OUTBOUND_QUEUE, SharedState, new_session_id};

/// Build the axum router for the gateway.
pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<SharedState>>,
    Query(query): Query<WsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(token) = query.token else {
        tracing::warn!("websocket handshake without a token");
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Some(identity) = state.verifier.verify(&token) else {
        tracing::warn!("websocket handshake with an invalid token");
        return Err(StatusCode::UNAUTHORIZED);
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

async fn handle_socket(socket: WebSocket, state: Arc<SharedState>, identity: Identity) {
    let session_id = new_session_id();
    tracing::info!(
        user = %identity.email,
        session = %session_id,
        "user connected"
    );

    // Snapshot the roster before registering so it excludes this session.
    let roster = state.online_identities();

    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    state.register(&session_id, identity.clone(), tx);

    // Tell everyone else this user is here, then replay the current roster
    // to the newcomer only; a late joiner has to converge on the online
    // set without an event log.
    relay::broadcast(
        &state,
        BROADCAST_ROOM,
        &session_id,
        &ServerEvent::PresenceOnline {
            user_id: identity.id,
            user_email: identity.email.clone(),
        },
    );
    for peer in roster {
        relay::send_to(
            &state,
            &session_id,
            &ServerEvent::PresenceOnline {
                user_id: peer.id,
                user_email: peer.email,
            },
        );
    }

    let (mut sender, mut receiver) = socket.split();

    let mut push_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let read_state = state.clone();
    let read_identity = identity.clone();
    let read_session = session_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(session = %read_session, "websocket error: {e}");
                    break;
                }
            };
            match frame {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        let stamped = relay::stamp(event, &read_identity);
                        relay::broadcast(&read_state, BROADCAST_ROOM, &read_session, &stamped);
                    }
                    // Malformed frames are dropped; the connection lives on.
                    Err(e) => {
                        tracing::warn!(
                            user = %read_identity.email,
                            "dropping malformed event: {e}"
                        );
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Either side ending tears the connection down.
    tokio::select! {
        _ = &mut read_task => push_task.abort(),
        _ = &mut push_task => read_task.abort(),
    }

    state.unregister(&session_id);
    relay::broadcast(
        &state,
        BROADCAST_ROOM,
        &session_id,
        &ServerEvent::PresenceOffline {
            user_id: identity.id,
            user_email: identity.email.clone(),
        },
    );
    tracing::info!(user = %identity.email, session = %session_id, "user disconnected");
}
