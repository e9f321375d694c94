use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use waypoint_core::config::GatewayConfig;
use waypoint_core::error::WaypointError;
use waypoint_engine::{WorkflowCatalog, WorkflowEngine};

use crate::routes;
use crate::state::AppState;

/// Build the HTTP router over the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/graph/workflows", get(routes::list_workflows))
        .route("/graph/tools", get(routes::list_tools))
        .route("/graph/create", post(routes::create_graph))
        .route("/graph/run", post(routes::run_graph))
        .route("/graph/run/async", post(routes::run_graph_async))
        .route("/graph/state/{run_id}", get(routes::get_run_state))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP gateway server built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    engine: Arc<WorkflowEngine>,
    catalog: Arc<WorkflowCatalog>,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        engine: Arc<WorkflowEngine>,
        catalog: Arc<WorkflowCatalog>,
    ) -> Self {
        Self {
            config,
            engine,
            catalog,
        }
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(AppState::new(self.engine.clone(), self.catalog.clone()));
        let app = build_router(state);

        let listener = TcpListener::bind(&self.config.bind)
            .await
            .map_err(|e| WaypointError::Gateway(format!("bind {}: {}", self.config.bind, e)))?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}
