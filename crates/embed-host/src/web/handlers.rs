//! Route handlers

use super::state::AppState;
use super::INDEX_HTML;
use crate::session::OpenOutcome;
use crate::surface::BrowserSurface;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use chrono::Utc;
use embed_renderer::RendererMessage;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "state": state.session.state().name(),
        "server": state.session.describe(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}

pub async fn list_tools_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "tools": state.session.tools() }))
}

pub async fn open_widget_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut surface = BrowserSurface::new();

    match state.session.open_widget(&mut surface).await {
        Ok(outcome) => {
            if let OpenOutcome::Failed { message } = &outcome {
                info!(error = %message, "Widget request returned a tool failure");
            }
            (StatusCode::OK, Json(json!(outcome)))
        }
        Err(e) => {
            error!(error = %e, "Widget request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "status": "error",
                    "kind": e.kind(),
                    "message": e.to_string(),
                })),
            )
        }
    }
}

/// Renderer logging channel. Events are recorded, never acted on.
pub async fn widget_event_handler(
    State(state): State<Arc<AppState>>,
    Json(message): Json<RendererMessage>,
) -> StatusCode {
    match &message {
        RendererMessage::WidgetEvent { event } => {
            info!(target: "embed_host::widget_events", event = %event, "Widget event");
        }
        RendererMessage::RenderError { message } => {
            warn!(target: "embed_host::widget_events", error = %message, "Renderer error");
        }
        RendererMessage::TornDown => {
            info!(target: "embed_host::widget_events", "Renderer torn down");
        }
    }
    state.record_event(message).await;
    StatusCode::ACCEPTED
}

pub async fn list_widget_events_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let events = state.events.read().await;
    Json(json!({ "events": *events }))
}
