//! Web front end
//!
//! - `GET /`                   chat-like page with the "Add Connector" button
//! - `POST /api/open-widget`   run one widget request, return the delivery as JSON
//! - `POST /api/widget-events` renderer logging channel
//! - `GET /api/widget-events`  recent renderer messages
//! - `GET /api/tools`          tools cached at connect time
//! - `GET /health`

mod handlers;
mod state;

pub use state::{AppState, WidgetEventRecord, EVENT_HISTORY};

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/open-widget", post(handlers::open_widget_handler))
        .route(
            "/widget-events",
            post(handlers::widget_event_handler).get(handlers::list_widget_events_handler),
        )
        .route("/tools", get(handlers::list_tools_handler));

    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/health", get(handlers::health_handler))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until SIGINT/SIGTERM, then close the widget server connection
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Host web front end listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(embed_core::shutdown_signal())
        .await?;

    state.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}
