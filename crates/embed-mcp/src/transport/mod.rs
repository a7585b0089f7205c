//! Transport Layer
//!
//! - Stdio: one server instance for the lifetime of the pipe
//! - HTTP: stateless, one fresh server instance per inbound request

mod http;
mod stdio;

pub use http::HttpTransport;
pub use stdio::{serve_lines, StdioTransport};

use crate::{McpRequest, McpResponse, WidgetContext, WidgetServer};
use anyhow::Result;
use std::sync::Arc;

/// Anything that can answer an MCP request
#[async_trait::async_trait]
pub trait McpHandler: Send + Sync {
    async fn handle_request(&self, request: McpRequest) -> McpResponse;
}

/// Builds handler instances for a transport
pub trait HandlerFactory: Send + Sync {
    type Handler: McpHandler + 'static;

    fn create(&self) -> Self::Handler;
}

/// Transport trait - implement for new transport types
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Serve requests until the transport closes
    async fn serve<F: HandlerFactory + 'static>(self, factory: Arc<F>) -> Result<()>;
}

#[async_trait::async_trait]
impl McpHandler for WidgetServer {
    async fn handle_request(&self, request: McpRequest) -> McpResponse {
        WidgetServer::handle_request(self, request).await
    }
}

impl HandlerFactory for WidgetContext {
    type Handler = WidgetServer;

    fn create(&self) -> WidgetServer {
        WidgetServer::new(self.clone())
    }
}
