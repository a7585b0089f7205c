//! embed-mcp: Widget Resource Server
//!
//! A small MCP server with exactly one tool and one resource:
//!
//! - `open-airbyte-widget` runs the two-hop token exchange and returns the
//!   widget token as structured output (failures come back as `isError`
//!   results, never as transport faults).
//! - `ui://airbyte/widget.html` is a fixed HTML document that embeds the
//!   third-party widget script and speaks the renderer message protocol.
//!
//! Architecture:
//! stdin/HTTP → JSON-RPC → WidgetServer → TokenExchangeClient → upstream API

pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{
    ContentBlock, JsonRpcError, McpRequest, McpResponse, ResourceContents, ResourceInfo,
    ToolInfo, ToolResult,
};
pub use resources::{ResourceRegistry, WIDGET_HTML, WIDGET_MIME_TYPE, WIDGET_RESOURCE_URI};
pub use server::{WidgetContext, WidgetServer};
pub use tools::{OPEN_WIDGET_TOOL, WIDGET_TOKEN_FIELD};

/// MCP protocol revision spoken by this server
pub const PROTOCOL_VERSION: &str = "2025-06-18";
pub const SERVER_NAME: &str = "airbyte-widget";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use super::transport::{HandlerFactory, McpHandler, Transport};
    pub use super::{McpRequest, McpResponse, WidgetContext, WidgetServer};
}
