//! REST API for the tracker

pub mod extract;
pub mod handlers;
pub mod present;
pub mod responses;
mod routes;

pub use routes::*;

use crate::auth::{IdentityProvider, TokenService};
use crate::config::{ApiConfig, ServerConfig};
use crate::database::PostgresManager;
use crate::media::MediaStore;
use crate::metrics::{track_requests, ApiMetrics};
use crate::services::SignInService;
use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{error, info};

/// Shared API state
#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<PostgresManager>,
    pub tokens: TokenService,
    pub sign_in: SignInService,
    pub media: MediaStore,
    pub metrics: Arc<ApiMetrics>,
    pub config: Arc<ApiConfig>,
}

impl ApiState {
    pub fn new(
        db: Arc<PostgresManager>,
        config: &ServerConfig,
        identity: Arc<dyn IdentityProvider>,
        metrics: Arc<ApiMetrics>,
    ) -> Self {
        let tokens = TokenService::new(&config.auth);
        let media = MediaStore::new(&config.media);
        let sign_in = SignInService::new(db.clone(), identity, media.clone(), tokens.clone());
        Self {
            db,
            tokens,
            sign_in,
            media,
            metrics,
            config: Arc::new(config.api.clone()),
        }
    }

    /// Mount point of the static media files
    fn media_prefix(&self) -> String {
        match self.media.url_prefix() {
            "" => "/media".to_string(),
            prefix => prefix.to_string(),
        }
    }
}

/// Start the API server
pub async fn start_server(state: ApiState, config: &ApiConfig) -> Result<tokio::task::JoinHandle<()>> {
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("API server listening on {}", config.bind_address);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("API server error: {}", e);
        }
    });

    Ok(handle)
}

/// Start the metrics server
pub async fn start_metrics_server(
    port: u16,
    state: ApiState,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(handle)
}

/// Create the main API application
pub fn create_router(state: ApiState) -> Router {
    let media_prefix = state.media_prefix();
    let media_files = ServeDir::new(state.media.root());
    let cors = state.config.enable_cors;
    let body_limit = state.config.max_request_size_mb * 1024 * 1024;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let mut app = Router::new()
        .merge(create_auth_routes())
        .merge(create_project_routes())
        .merge(create_people_routes())
        .merge(create_ticket_routes())
        .route("/health", get(health_handler))
        .route_layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_requests,
        ))
        .nest_service(&media_prefix, media_files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout)),
        );
    if cors {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Health check handler
async fn health_handler(State(state): State<ApiState>) -> Response {
    let database = state.db.health_check().await.is_ok();
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if database { "healthy" } else { "degraded" },
        "database": database,
        "timestamp": chrono::Utc::now().timestamp(),
        "service": "clickup-server"
    });
    (status, Json(body)).into_response()
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<ApiState>) -> Result<String, StatusCode> {
    state.metrics.encode().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
