//! Startup orchestration.
//!
//! # Responsibilities
//! - Start background services (metrics exporter)
//! - Build the server from a validated configuration
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::RelayConfig;
use crate::http::{RelayServer, ServerError};
use crate::observability::metrics;

/// Errors that prevent the relay from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the relay and serve until shutdown.
pub async fn start(
    config: RelayConfig,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstream = config.upstream.forward_url().unwrap_or("<local mode>"),
        max_files = config.uploads.max_files,
        max_file_size = config.uploads.max_file_size,
        rate_limit = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let server = RelayServer::new(config)?;

    let address = server.config().listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, shutdown).await?;
    Ok(())
}
