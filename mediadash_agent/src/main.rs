//! mediadash_agent binary: read configuration, start the HTTP/WebSocket server.

use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mediadash_agent::config::{parse_port, Config};
use mediadash_agent::router;
use mediadash_agent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if env::args().any(|a| a == "-h" || a == "--help") {
        println!("Usage: mediadash_agent [--port PORT|-p PORT]");
        println!("Configuration is read from the environment (DASHBOARD_PORT, QB_URL, LOG_DIR, ...).");
        return Ok(());
    }

    let mut config = Config::from_env();
    config.port = parse_port(env::args(), config.port);
    let port = config.port;

    info!(
        "monitoring {} services every {:?}, logs from {}",
        config.services.len(),
        config.status_interval,
        config.log_dir.display()
    );
    let state = AppState::new(config).context("building http clients")?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("mediadash agent listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
