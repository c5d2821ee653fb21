//! Compliance evidence HTTP server
//!
//! Loads configuration from the environment (and `.env`), opens the database,
//! and serves the JSON API.

use std::net::SocketAddr;
use std::sync::Arc;

use compliance_evidence::server::{router, AppState};
use compliance_evidence::utils::{load_env, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("compliance_evidence=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = AppConfig::from_env()?;
    let state = match AppState::from_config(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize application state: {:#}", e);
            tracing::error!("Check permissions and free space in {}", config.data_dir.display());
            std::process::exit(1);
        }
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Compliance evidence API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
