//! Renderer message sets
//!
//! Both sets are closed. On the wire each message is a JSON object tagged by
//! `type`, e.g. `{"type":"widget-token","token":"..."}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host → renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    /// Direct token hand-off
    WidgetToken { token: String },
    /// Full `tools/call` result; the token sits at `structuredContent.widgetToken`
    ToolResult { result: Value },
    /// Host-initiated teardown (navigation away, panel closed)
    Teardown,
}

impl HostMessage {
    pub fn widget_token(token: impl Into<String>) -> Self {
        HostMessage::WidgetToken {
            token: token.into(),
        }
    }

    /// Token carried by this message, if any
    pub fn token(&self) -> Option<&str> {
        let token = match self {
            HostMessage::WidgetToken { token } => Some(token.as_str()),
            HostMessage::ToolResult { result } => result
                .get("structuredContent")
                .and_then(|s| s.get("widgetToken"))
                .and_then(Value::as_str),
            HostMessage::Teardown => None,
        };
        token.filter(|token| !token.is_empty())
    }
}

/// Renderer → host. Forwarded to the host's log; never awaited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RendererMessage {
    WidgetEvent { event: Value },
    RenderError { message: String },
    TornDown,
}
