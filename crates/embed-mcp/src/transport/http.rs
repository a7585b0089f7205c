//! HTTP Transport
//!
//! Stateless JSON-RPC over `POST /mcp`. No session id is issued and no
//! connection state survives a request: each one gets its own handler.

use super::{HandlerFactory, McpHandler, Transport};
use crate::{JsonRpcError, McpRequest, McpResponse};
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

/// HTTP transport (REST endpoint + health)
pub struct HttpTransport {
    bind_addr: String,
}

impl HttpTransport {
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
        }
    }

    /// Routes for a factory; exposed so callers can mount it on their own listener
    pub fn router<F: HandlerFactory + 'static>(factory: Arc<F>) -> Router {
        Router::new()
            .route("/", get(root_handler).post(mcp_handler::<F>))
            .route("/mcp", post(mcp_handler::<F>))
            .route("/health", get(health_handler))
            .with_state(factory)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn serve<F: HandlerFactory + 'static>(self, factory: Arc<F>) -> Result<()> {
        let app = Self::router(factory);

        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;
        info!(addr = %listener.local_addr()?, "HTTP transport listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(embed_core::shutdown_signal())
            .await?;
        info!("HTTP transport shut down");
        Ok(())
    }
}

// === Handlers ===

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": crate::SERVER_NAME,
        "version": crate::SERVER_VERSION,
        "protocol": crate::PROTOCOL_VERSION,
        "endpoints": {
            "mcp": "POST /mcp",
            "health": "GET /health"
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": crate::SERVER_NAME,
        "version": crate::SERVER_VERSION
    }))
}

async fn mcp_handler<F: HandlerFactory>(State(factory): State<Arc<F>>, body: Bytes) -> Response {
    let request = match serde_json::from_slice::<McpRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            let response = McpResponse::error(None, JsonRpcError::parse_error(e.to_string()));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    debug!(method = %request.method, "HTTP MCP request");
    let handler = factory.create();

    if request.is_notification() {
        handler.handle_request(request).await;
        return StatusCode::ACCEPTED.into_response();
    }

    Json(handler.handle_request(request).await).into_response()
}
