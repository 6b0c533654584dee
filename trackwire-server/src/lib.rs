//! Realtime gateway for the trackwire issue tracker.
//!
//! Accepts token-authenticated WebSocket connections, tracks room
//! membership and presence, and relays domain events between sessions. The
//! gateway is a dumb fanout: mutation validity was established by the REST
//! tier before the client emitted, so the relay only stamps the originator
//! identity and forwards.
//!
//! Module map:
//! - [`auth`] — bearer-token verification (HMAC-SHA256, shared secret)
//! - [`server`] — shared state (connections, rooms) and the listener
//! - [`gateway`] — the axum router and per-socket handler
//! - [`relay`] — originator stamping and room fanout
//! - [`config`] — CLI/env configuration

pub mod auth;
pub mod config;
pub mod gateway;
pub mod relay;
pub mod server;
