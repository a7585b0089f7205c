//! Render surfaces
//!
//! A surface receives the widget document plus its token once the tool call
//! succeeded. The browser page and the in-process renderer channel are the
//! two surfaces the host knows about.

use embed_core::Result;
use embed_renderer::{
    EmbeddedWidget, EventSink, HostEndpoint, HostMessage, WidgetError, WidgetFactory,
    WidgetOptions,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

/// Everything a renderer needs to show the widget
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDelivery {
    pub resource_uri: String,
    pub mime_type: Option<String>,
    pub html: String,
    pub token: String,
    /// Raw `tools/call` result, for renderers that pull the token from it
    pub tool_result: Value,
    /// `_meta` of the resource contents (CSP and friends)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl WidgetDelivery {
    /// Message carrying the token to the renderer
    pub fn token_message(&self) -> HostMessage {
        HostMessage::widget_token(self.token.clone())
    }

    pub fn tool_result_message(&self) -> HostMessage {
        HostMessage::ToolResult {
            result: self.tool_result.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait RenderSurface: Send {
    async fn deliver(&mut self, delivery: &WidgetDelivery) -> Result<()>;
}

/// Browser page: keeps the delivery so the web layer can hand it to the page
#[derive(Default)]
pub struct BrowserSurface {
    delivered: Option<WidgetDelivery>,
}

impl BrowserSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Option<WidgetDelivery> {
        self.delivered.take()
    }
}

#[async_trait::async_trait]
impl RenderSurface for BrowserSurface {
    async fn deliver(&mut self, delivery: &WidgetDelivery) -> Result<()> {
        self.delivered = Some(delivery.clone());
        Ok(())
    }
}

/// How the token reaches an in-process renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenHandoff {
    /// `{type: "widget-token", token}`
    #[default]
    Direct,
    /// `{type: "tool-result", result}`
    ToolResult,
}

/// In-process renderer reached through its message channel
pub struct ChannelSurface {
    endpoint: HostEndpoint,
    handoff: TokenHandoff,
}

impl ChannelSurface {
    pub fn new(endpoint: HostEndpoint) -> Self {
        Self {
            endpoint,
            handoff: TokenHandoff::Direct,
        }
    }

    pub fn with_handoff(mut self, handoff: TokenHandoff) -> Self {
        self.handoff = handoff;
        self
    }

    pub fn endpoint(&mut self) -> &mut HostEndpoint {
        &mut self.endpoint
    }

    pub fn into_endpoint(self) -> HostEndpoint {
        self.endpoint
    }
}

#[async_trait::async_trait]
impl RenderSurface for ChannelSurface {
    async fn deliver(&mut self, delivery: &WidgetDelivery) -> Result<()> {
        info!(
            uri = %delivery.resource_uri,
            bytes = delivery.html.len(),
            "Delivering widget document to renderer"
        );
        let message = match self.handoff {
            TokenHandoff::Direct => delivery.token_message(),
            TokenHandoff::ToolResult => delivery.tool_result_message(),
        };
        self.endpoint.send(message)
    }
}

/// Headless widget: logs its lifecycle instead of drawing anything.
/// Used by `embed-host open` to exercise the full handshake from a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWidgetFactory;

struct LoggingWidget {
    token_len: usize,
    events: EventSink,
}

impl EmbeddedWidget for LoggingWidget {
    fn open(&mut self) -> std::result::Result<(), WidgetError> {
        info!(token_bytes = self.token_len, "Headless widget opened");
        self.events
            .emit(json!({"type": "widget_opened", "headless": true}));
        Ok(())
    }

    fn destroy(&mut self) -> std::result::Result<(), WidgetError> {
        info!("Headless widget destroyed");
        Ok(())
    }
}

impl WidgetFactory for LoggingWidgetFactory {
    fn create(
        &self,
        options: WidgetOptions,
        events: EventSink,
    ) -> std::result::Result<Box<dyn EmbeddedWidget>, WidgetError> {
        if options.token.is_empty() {
            return Err(WidgetError("Empty widget token".into()));
        }
        Ok(Box::new(LoggingWidget {
            token_len: options.token.len(),
            events,
        }))
    }
}
