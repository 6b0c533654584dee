use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Use JSON logs in production (TRACKWIRE_LOG_JSON=1), human-readable otherwise
    let json_logs = std::env::var("TRACKWIRE_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::from_default_env().add_directive("trackwire_server=info".parse()?);
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = trackwire_server::config::ServerConfig::parse();
    tracing::info!("Starting realtime gateway on {}", config.listen_addr);

    let server = trackwire_server::server::Server::new(config);
    server.run().await
}
