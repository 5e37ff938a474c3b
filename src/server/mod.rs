//! Server module
//!
//! HTTP and WebSocket front end for the classroom session.

pub mod hub;
mod ws;

use crate::config::{Config, ServerConfig};
use crate::session::{Session, SessionHandle};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use hub::Hub;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub hub: Arc<Hub>,
}

/// `POST /check-name` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckNameRequest {
    pub name: String,
}

/// `POST /check-name` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckNameResponse {
    pub available: bool,
}

/// `GET /health` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub connections: usize,
    pub teachers: usize,
    pub students: usize,
    pub polls: usize,
    pub active_poll_id: Option<String>,
    pub chat_messages: usize,
}

/// Build the router
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/check-name", post(check_name_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// CORS policy from configured origins; `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn check_name_handler(
    State(state): State<AppState>,
    Json(request): Json<CheckNameRequest>,
) -> Response {
    match state.session.check_name(request.name).await {
        Ok(available) => Json(CheckNameResponse { available }).into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    match state.session.stats().await {
        Ok(stats) => Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            connections: state.hub.connection_count(),
            teachers: stats.teachers,
            students: stats.students,
            polls: stats.polls,
            active_poll_id: stats.active_poll_id,
            chat_messages: stats.chat_messages,
        })
        .into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

/// Resolve the listen address from config
pub fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    format!("{}:{}", config.bind, config.port)
        .parse::<SocketAddr>()
        .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", config.bind, config.port)))
}

/// Start the session actor and serve until `shutdown` resolves
pub async fn serve(
    config: &Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr = bind_addr(&config.server)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_listener(listener, config, shutdown).await
}

/// Serve on an already bound listener
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    config: &Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let hub = Arc::new(Hub::new());
    let session = Session::new(config.session.to_options());
    let (session, _actor) = SessionHandle::spawn(session, hub.clone());

    let app = create_router(
        AppState { session, hub },
        cors_layer(&config.server.cors_origins),
    );

    info!(address = %listener.local_addr()?, "pollroom listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server stopped");
    Ok(())
}
