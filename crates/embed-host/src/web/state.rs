//! Shared state for the web handlers

use crate::session::HostSession;
use chrono::{DateTime, Utc};
use embed_renderer::RendererMessage;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Renderer messages kept for `GET /api/widget-events`
pub const EVENT_HISTORY: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct WidgetEventRecord {
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub message: RendererMessage,
}

pub struct AppState {
    /// Shared by every handler; requests run concurrently
    pub session: Arc<HostSession>,
    pub events: RwLock<VecDeque<WidgetEventRecord>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wrap a session that has already connected
    pub fn new(session: HostSession) -> Self {
        Self {
            session: Arc::new(session),
            events: RwLock::new(VecDeque::with_capacity(EVENT_HISTORY)),
            started_at: Utc::now(),
        }
    }

    pub async fn record_event(&self, message: RendererMessage) -> WidgetEventRecord {
        let record = WidgetEventRecord {
            received_at: Utc::now(),
            message,
        };
        let mut events = self.events.write().await;
        if events.len() == EVENT_HISTORY {
            events.pop_front();
        }
        events.push_back(record.clone());
        record
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.session.close().await {
            warn!(error = %e, "Failed to close widget server connection");
        }
    }
}
