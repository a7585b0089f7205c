//! Host session: one connection to the widget server and the host state machine
//!
//! The session is shared between concurrent requests. Each widget request
//! walks its own copy of the state machine and publishes every step to the
//! session, so `state()` shows the most recent transition. Locks are held only
//! while a state is swapped, never across I/O.

use crate::connection::ServerConnection;
use crate::state::HostState;
use crate::surface::{RenderSurface, WidgetDelivery};
use embed_core::{Error, Result};
use embed_mcp::tools::widget_token_from;
use embed_mcp::{
    McpRequest, ResourceContents, ToolInfo, ToolResult, OPEN_WIDGET_TOOL, PROTOCOL_VERSION,
    WIDGET_RESOURCE_URI,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub const CLIENT_NAME: &str = "embed-host";

pub const CANCELLED_MESSAGE: &str = "Widget request cancelled";

/// What happened to one "open widget" request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OpenOutcome {
    Rendered {
        message: String,
        delivery: WidgetDelivery,
    },
    /// The tool reported a failure; the widget does not open
    Failed { message: String },
}

impl OpenOutcome {
    pub fn message(&self) -> &str {
        match self {
            OpenOutcome::Rendered { message, .. } | OpenOutcome::Failed { message } => message,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, OpenOutcome::Rendered { .. })
    }
}

pub struct HostSession {
    connection: Arc<dyn ServerConnection>,
    state: Mutex<HostState>,
    tools: Vec<ToolInfo>,
    server_info: Option<Value>,
    next_id: AtomicU64,
}

impl HostSession {
    pub fn new(connection: Box<dyn ServerConnection>) -> Self {
        Self {
            connection: Arc::from(connection),
            state: Mutex::new(HostState::Idle),
            tools: Vec::new(),
            server_info: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Most recent transition of the session or of any request on it
    pub fn state(&self) -> HostState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: HostState) {
        *self.lock_state() = state;
    }

    /// Tools listed at connect time; never refreshed
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    pub fn server_info(&self) -> Option<&Value> {
        self.server_info.as_ref()
    }

    pub fn describe(&self) -> String {
        self.connection.describe()
    }

    /// Handshake and enumerate tools. A failure here is fatal for the session.
    pub async fn connect(&mut self) -> Result<()> {
        self.lock_state().transition(HostState::Connecting)?;
        info!(server = %self.connection.describe(), "Connecting");

        match self.handshake().await {
            Ok(()) => {
                self.lock_state().transition(HostState::Connected)?;
                info!(tools = self.tools.len(), "Connected to widget server");
                Ok(())
            }
            Err(e) => {
                self.lock_state().transition(HostState::Error {
                    message: e.to_string(),
                    recoverable: false,
                })?;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> Result<()> {
        let init = self
            .rpc(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": { "name": CLIENT_NAME, "version": env!("CARGO_PKG_VERSION") }
                }),
            )
            .await?;
        self.server_info = init.get("serverInfo").cloned();

        self.connection
            .notify(McpRequest::notification("notifications/initialized"))
            .await?;

        let listed = self.rpc("tools/list", json!({})).await?;
        self.tools = serde_json::from_value(listed.get("tools").cloned().unwrap_or(json!([])))
            .map_err(|e| Error::protocol(format!("Invalid tools/list result: {}", e)))?;
        for tool in &self.tools {
            debug!(tool = %tool.name, "Discovered tool");
        }
        Ok(())
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let request = McpRequest::call(id, method, params);
        let response = self.connection.request(request).await?;

        if let Some(err) = response.error {
            return Err(Error::protocol(format!(
                "{} failed: {} ({})",
                method, err.message, err.code
            )));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Invoke a tool; returns the typed result and the raw JSON it came from
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<(ToolResult, Value)> {
        let raw = self
            .rpc("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        let result = serde_json::from_value(raw.clone())
            .map_err(|e| Error::protocol(format!("Invalid tools/call result: {}", e)))?;
        Ok((result, raw))
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContents> {
        let raw = self.rpc("resources/read", json!({ "uri": uri })).await?;
        let contents: Vec<ResourceContents> =
            serde_json::from_value(raw.get("contents").cloned().unwrap_or(json!([])))
                .map_err(|e| Error::protocol(format!("Invalid resources/read result: {}", e)))?;
        contents
            .into_iter()
            .next()
            .ok_or_else(|| Error::protocol(format!("Resource {} has no contents", uri)))
    }

    /// UI resource advertised by the widget tool, falling back to the well-known URI
    pub fn widget_resource_uri(&self) -> String {
        self.tools
            .iter()
            .find(|t| t.name == OPEN_WIDGET_TOOL)
            .and_then(|t| t.meta.as_ref())
            .and_then(|m| m.get("ui"))
            .and_then(|ui| ui.get("resourceUri"))
            .and_then(Value::as_str)
            .unwrap_or(WIDGET_RESOURCE_URI)
            .to_string()
    }

    /// One user request: call the tool, fetch the document, hand both to the surface.
    ///
    /// Tool failures come back as [`OpenOutcome::Failed`] and leave the request
    /// in a recoverable error state. Transport failures are returned as errors.
    /// Dropping the future mid-request records a recoverable error.
    pub async fn open_widget(&self, surface: &mut dyn RenderSurface) -> Result<OpenOutcome> {
        let current = self.state();
        if !current.is_live() {
            return Err(Error::internal(format!(
                "Cannot open widget while {}",
                current
            )));
        }

        let mut flow = RequestFlow::start(self)?;

        let (result, raw) = match self.call_tool(OPEN_WIDGET_TOOL, json!({})).await {
            Ok(r) => r,
            Err(e) => {
                flow.fail(e.to_string())?;
                return Err(e);
            }
        };

        if result.is_error {
            let message = result.text();
            flow.fail(message.clone())?;
            return Ok(OpenOutcome::Failed { message });
        }

        let Some(token) = widget_token_from(result.structured_content.as_ref()) else {
            let message = "Tool result carried no widget token".to_string();
            flow.fail(message.clone())?;
            return Ok(OpenOutcome::Failed { message });
        };
        let token = token.to_string();

        let uri = self.widget_resource_uri();
        let contents = match self.read_resource(&uri).await {
            Ok(c) => c,
            Err(e) => {
                flow.fail(e.to_string())?;
                return Err(e);
            }
        };

        flow.advance(HostState::Rendering)?;
        let delivery = WidgetDelivery {
            resource_uri: contents.uri,
            mime_type: contents.mime_type,
            html: contents.text,
            token,
            tool_result: raw,
            meta: contents.meta,
        };

        let delivered = surface.deliver(&delivery).await;
        flow.advance(HostState::Connected)?;
        if let Err(e) = delivered {
            warn!(error = %e, "Render surface rejected the widget");
            return Err(e);
        }

        info!(uri = %delivery.resource_uri, "Widget handed to renderer");
        Ok(OpenOutcome::Rendered {
            message: result.text(),
            delivery,
        })
    }

    pub async fn close(&self) -> Result<()> {
        self.connection.close().await?;
        self.lock_state().transition(HostState::Idle)
    }
}

/// One request's walk through the state machine
struct RequestFlow<'a> {
    session: &'a HostSession,
    state: HostState,
}

impl<'a> RequestFlow<'a> {
    fn start(session: &'a HostSession) -> Result<Self> {
        let mut flow = Self {
            session,
            state: HostState::Connected,
        };
        flow.advance(HostState::AwaitingToolResult)?;
        Ok(flow)
    }

    fn advance(&mut self, next: HostState) -> Result<()> {
        self.state.transition(next.clone())?;
        self.session.publish(next);
        Ok(())
    }

    fn fail(&mut self, message: String) -> Result<()> {
        warn!(error = %message, "Widget request failed");
        self.advance(HostState::Error {
            message,
            recoverable: true,
        })
    }
}

impl Drop for RequestFlow<'_> {
    fn drop(&mut self) {
        if matches!(
            self.state,
            HostState::AwaitingToolResult | HostState::Rendering
        ) {
            warn!(state = self.state.name(), "Widget request dropped before completing");
            self.session.publish(HostState::Error {
                message: CANCELLED_MESSAGE.to_string(),
                recoverable: true,
            });
        }
    }
}
