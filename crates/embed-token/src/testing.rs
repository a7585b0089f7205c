//! In-process stand-in for the upstream token API.
//!
//! Binds an `axum` server on `127.0.0.1:0`, answers each endpoint with a
//! scripted reply and records every request it sees.

use crate::client::{APPLICATION_TOKEN_PATH, WIDGET_TOKEN_PATH};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use embed_core::ExchangeSettings;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_CLIENT_ID: &str = "test-client";
pub const TEST_CLIENT_SECRET: &str = "test-secret";

/// Scripted answer for one endpoint
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn token(token: &str) -> Self {
        Self::json(200, json!({ "token": token }))
    }

    pub fn status(status: u16) -> Self {
        Self::json(status, json!({ "detail": "rejected" }))
    }

    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// One request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

struct MockState {
    application: Mutex<MockReply>,
    widget: Mutex<MockReply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Running mock upstream; the server task lives until the process ends
pub struct MockAirbyte {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockAirbyte {
    /// Start with `{token: "app-token"}` / `{token: "widget-token"}` replies
    pub async fn start() -> Self {
        Self::with_replies(MockReply::token("app-token"), MockReply::token("widget-token")).await
    }

    pub async fn with_replies(application: MockReply, widget: MockReply) -> Self {
        let state = Arc::new(MockState {
            application: Mutex::new(application),
            widget: Mutex::new(widget),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(&format!("/api/v1{}", APPLICATION_TOKEN_PATH), post(application_token))
            .route(&format!("/api/v1{}", WIDGET_TOKEN_PATH), post(widget_token))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock upstream");
        let addr = listener.local_addr().expect("mock upstream address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Settings with test credentials pointed at this mock
    pub fn settings(&self) -> ExchangeSettings {
        ExchangeSettings {
            airbyte_client_id: TEST_CLIENT_ID.to_string(),
            airbyte_client_secret: TEST_CLIENT_SECRET.to_string(),
            airbyte_api_base: self.base_url(),
            ..Default::default()
        }
    }

    pub fn set_application_reply(&self, reply: MockReply) {
        *self.state.application.lock().expect("mock lock") = reply;
    }

    pub fn set_widget_reply(&self, reply: MockReply) {
        *self.state.widget.lock().expect("mock lock") = reply;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("mock lock").clone()
    }

    pub fn application_hits(&self) -> usize {
        self.hits(APPLICATION_TOKEN_PATH)
    }

    pub fn widget_hits(&self) -> usize {
        self.hits(WIDGET_TOKEN_PATH)
    }

    fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path.ends_with(path)).count()
    }
}

async fn application_token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let reply = state.application.lock().expect("mock lock").clone();
    record(&state, APPLICATION_TOKEN_PATH, &headers, body);
    respond(reply).await
}

async fn widget_token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let reply = state.widget.lock().expect("mock lock").clone();
    record(&state, WIDGET_TOKEN_PATH, &headers, body);
    respond(reply).await
}

fn record(state: &MockState, path: &str, headers: &HeaderMap, body: Value) {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().expect("mock lock").push(RecordedRequest {
        path: path.to_string(),
        authorization,
        body,
    });
}

async fn respond(reply: MockReply) -> Response {
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}
