//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, rate limit, headers)
//! - Bind server to listener
//! - Run background maintenance (rate limiter pruning)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::{status, upload};
use crate::lifecycle::signals::shutdown_signal;
use crate::relay::{Mode, Relay};
use crate::security::{cors_layer, rate_limit_middleware, with_security_headers, RateLimiterState};

/// Path of the upload endpoint.
pub const UPLOAD_PATH: &str = "/api/lead-upload";

/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP server for the upload relay.
pub struct RelayServer {
    router: Router,
    config: RelayConfig,
    relay: Arc<Relay>,
    limiter: Option<Arc<RateLimiterState>>,
}

impl RelayServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let relay = Arc::new(Relay::from_config(&config)?);
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiterState::new(&config.rate_limit)));

        let state = AppState {
            relay: relay.clone(),
        };
        let router = Self::build_router(&config, state, limiter.clone());

        Ok(Self {
            router,
            config,
            relay,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &RelayConfig,
        state: AppState,
        limiter: Option<Arc<RateLimiterState>>,
    ) -> Router {
        let mut uploads = Router::new()
            .route(UPLOAD_PATH, post(upload::lead_upload))
            .layer(DefaultBodyLimit::max(config.uploads.max_body_bytes()));
        if let Some(limiter) = limiter {
            uploads =
                uploads.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let mut router = Router::new()
            .route(HEALTH_PATH, get(status::health))
            .merge(uploads)
            .with_state(state);

        if config.security.enable_headers {
            router = with_security_headers(router);
        }

        router.layer(cors_layer(&config.cors)).layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until Ctrl-C, SIGTERM, or a message on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        self.relay.scratch().ensure().await?;
        tracing::info!(
            address = %addr,
            mode = ?self.relay.mode(),
            scratch_dir = %self.relay.scratch().path().display(),
            "HTTP server starting"
        );
        if self.relay.mode() == Mode::Local {
            tracing::warn!("No upstream configured, uploads stay in scratch storage");
        }

        let pruner = self.limiter.clone().map(|limiter| {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(limiter.window());
                loop {
                    interval.tick().await;
                    limiter.prune();
                }
            })
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        // Serve with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        if let Some(pruner) = pruner {
            pruner.abort();
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
