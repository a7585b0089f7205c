//! Widget MCP Server
//!
//! Transport-agnostic request handling. A `WidgetServer` is cheap to build
//! from a `WidgetContext`, so the HTTP binding can create one per request.

use crate::protocol::{JsonRpcError, McpRequest, McpResponse};
use crate::resources::ResourceRegistry;
use crate::tools::{self, OPEN_WIDGET_TOOL};
use crate::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};
use embed_core::ExchangeSettings;
use embed_token::{TokenExchangeClient, WidgetTokenSource};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Process-wide, read-only state shared by every server instance
#[derive(Clone)]
pub struct WidgetContext {
    name: String,
    token_source: Arc<dyn WidgetTokenSource>,
    resources: Arc<ResourceRegistry>,
}

impl WidgetContext {
    pub fn new(token_source: Arc<dyn WidgetTokenSource>) -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            token_source,
            resources: Arc::new(ResourceRegistry::new()),
        }
    }

    /// Validate credentials and build the HTTP exchange client.
    ///
    /// Missing credentials are a configuration error (fatal at startup).
    pub fn from_settings(settings: ExchangeSettings) -> embed_core::Result<Self> {
        settings.require_credentials()?;
        let client = TokenExchangeClient::new(settings)?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }
}

/// One MCP server instance
pub struct WidgetServer {
    context: WidgetContext,
}

impl WidgetServer {
    pub fn new(context: WidgetContext) -> Self {
        Self { context }
    }

    /// Handle an MCP request
    pub async fn handle_request(&self, request: McpRequest) -> McpResponse {
        debug!(method = %request.method, "Handling MCP request");

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "notifications/initialized" | "initialized" => {
                McpResponse::success(request.id, json!({}))
            }
            "ping" => McpResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request).await,
            "resources/list" => self.handle_resources_list(request),
            "resources/read" => self.handle_resources_read(request),
            _ => McpResponse::error(request.id, JsonRpcError::method_not_found(&request.method)),
        }
    }

    fn handle_initialize(&self, request: McpRequest) -> McpResponse {
        let client_info = request.params.as_ref().and_then(|p| p.get("clientInfo"));
        let client_name = client_info
            .and_then(|ci| ci.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let client_version = client_info
            .and_then(|ci| ci.get("version"))
            .and_then(Value::as_str)
            .unwrap_or("?");

        info!(client = %client_name, version = %client_version, "Client connected");

        McpResponse::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false },
                    "resources": { "subscribe": false, "listChanged": false }
                },
                "serverInfo": {
                    "name": self.context.name,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    fn handle_tools_list(&self, request: McpRequest) -> McpResponse {
        McpResponse::success(
            request.id,
            json!({ "tools": [tools::open_widget_descriptor()] }),
        )
    }

    async fn handle_tools_call(&self, request: McpRequest) -> McpResponse {
        let params = match &request.params {
            Some(p) => p,
            None => {
                return McpResponse::error(request.id, JsonRpcError::invalid_params("Missing params"))
            }
        };

        let tool_name = match params.get("name").and_then(Value::as_str) {
            Some(n) => n,
            None => {
                return McpResponse::error(
                    request.id,
                    JsonRpcError::invalid_params("Missing tool name"),
                )
            }
        };

        if tool_name != OPEN_WIDGET_TOOL {
            warn!(tool = %tool_name, "Unknown tool requested");
            return McpResponse::error(
                request.id,
                JsonRpcError::invalid_params(format!("Unknown tool: {}", tool_name)),
            );
        }

        match params.get("arguments") {
            None | Some(Value::Null) | Some(Value::Object(_)) => {}
            Some(_) => {
                return McpResponse::error(
                    request.id,
                    JsonRpcError::invalid_params("Tool arguments must be an object"),
                )
            }
        }

        let result = tools::open_widget(self.context.token_source.as_ref()).await;
        match serde_json::to_value(&result) {
            Ok(value) => McpResponse::success(request.id, value),
            Err(e) => McpResponse::error(request.id, JsonRpcError::internal_error(e.to_string())),
        }
    }

    fn handle_resources_list(&self, request: McpRequest) -> McpResponse {
        McpResponse::success(
            request.id,
            json!({ "resources": self.context.resources.list_resources() }),
        )
    }

    fn handle_resources_read(&self, request: McpRequest) -> McpResponse {
        let uri = request
            .params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .unwrap_or("");

        if uri.is_empty() {
            return McpResponse::error(request.id, JsonRpcError::invalid_params("Missing uri"));
        }

        match self.context.resources.read_resource(uri) {
            Some(contents) => McpResponse::success(request.id, json!({ "contents": [contents] })),
            None => McpResponse::error(request.id, JsonRpcError::resource_not_found(uri)),
        }
    }
}
