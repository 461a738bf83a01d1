//! API Server
//!
//! Router assembly, middleware stack and graceful shutdown.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::{config::ServerConfig, games::MinesEngine, metrics::EngineMetrics};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

pub struct ApiServer {
    config: ServerConfig,
    engine: Arc<MinesEngine>,
    metrics: Option<Arc<EngineMetrics>>,
}

impl ApiServer {
    pub fn new(config: ServerConfig, engine: Arc<MinesEngine>, metrics: Option<Arc<EngineMetrics>>) -> Self {
        Self {
            config,
            engine,
            metrics,
        }
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.socket_addr()?;
        let app = self.router();

        self.log_server_info(addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped gracefully");
        Ok(())
    }

    /// Application router with the full middleware stack
    pub fn router(&self) -> axum::Router {
        let state = Arc::new(AppState {
            engine: self.engine.clone(),
            metrics: self.metrics.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });

        create_router(state)
            // Request ID first so handlers can tag errors
            .layer(axum::middleware::from_fn(request_id_middleware))
            // CORS before timeout to answer preflight
            .layer(create_cors_layer(&self.config.allowed_origins))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    fn log_server_info(&self, addr: SocketAddr) {
        let settings = self.engine.settings();
        info!("Server configuration:");
        info!("   Listen: {}", addr);
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);
        info!("   Disclosure: {:?}", settings.disclosure);
        info!("   House edge: {}", settings.house_edge);
        info!("   Metrics enabled: {}", self.metrics.is_some());
        info!("Available endpoints:");
        info!("   POST /api/start");
        info!("   POST /api/reveal");
        info!("   POST /api/cashout");
        info!("   GET  /api/history");
        info!("   GET  /api/verify/:game_id");
        info!("   GET  /health, /metrics");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
