use std::sync::Arc;

use mtx_sdk::Microtext;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Microtext HTTP server.
pub struct MicrotextServer {
    config: ServerConfig,
    microtext: Arc<Microtext>,
}

impl MicrotextServer {
    pub fn new(config: ServerConfig, microtext: Microtext) -> Self {
        Self {
            config,
            microtext: Arc::new(microtext),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(self.microtext.clone()), &self.config)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("Microtext server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
