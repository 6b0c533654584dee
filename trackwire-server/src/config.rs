//! Server configuration.

use clap::Parser;

/// Command-line / environment configuration for the gateway.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "trackwire-server",
    about = "Realtime gateway for the trackwire issue tracker"
)]
pub struct ServerConfig {
    /// Address for the HTTP/WebSocket listener.
    #[arg(long, env = "TRACKWIRE_LISTEN_ADDR", default_value = "127.0.0.1:4600")]
    pub listen_addr: String,

    /// Shared secret for verifying bearer tokens. Must match the secret the
    /// REST tier signs tokens with at login.
    #[arg(long, env = "TRACKWIRE_AUTH_SECRET")]
    pub auth_secret: String,
}
