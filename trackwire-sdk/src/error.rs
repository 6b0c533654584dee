//! Error types for the SDK.

use thiserror::Error;

/// Errors from the realtime client.
///
/// None of these are fatal to the application: the tracker stays fully
/// usable over REST, only the live affordances (presence badges, typing
/// indicators, instant list updates) degrade.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `connect()` was called without a stored credential. No transport is
    /// created.
    #[error("no credential available for realtime connection")]
    MissingCredential,
    /// The gateway refused the handshake (missing, invalid, or expired
    /// credential).
    #[error("realtime handshake rejected by the gateway")]
    Rejected,
    #[error("websocket transport error: {0}")]
    Transport(String),
}

/// Errors from the REST collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}
