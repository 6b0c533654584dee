//! Client SDK for the trackwire realtime issue tracker.
//!
//! This crate carries the wire protocol (the nine-kind domain-event union),
//! the session-scoped realtime client, the interfaces to the external REST
//! tier, and the reconciliation stores that merge bulk fetches, local
//! mutation results, and peer broadcasts into one consistent view.
//!
//! The gateway (`trackwire-server`) depends on this crate for the event
//! types, so both ends of the socket parse the same tagged union.

pub mod api;
pub mod client;
pub mod error;
pub mod event;
pub mod store;
pub mod sync;
pub mod types;

pub use client::{ConnectConfig, RealtimeClient};
pub use error::{ApiError, ClientError};
pub use event::{ClientEvent, EventKind, ServerEvent};
pub use types::{CommentNode, CommentSnapshot, Identity, IssueSnapshot, IssueStatus, Role};
