//! Resource Registry for MCP
//!
//! Serves the single widget document. The document is rendered once per
//! process and every read returns the same bytes.

use crate::protocol::{ResourceContents, ResourceInfo};
use serde_json::{json, Value};
use std::sync::OnceLock;

pub const WIDGET_RESOURCE_URI: &str = "ui://airbyte/widget.html";

/// MCP Apps UI resource media type
pub const WIDGET_MIME_TYPE: &str = "text/html;profile=mcp-app";

pub const DEFAULT_WIDGET_SCRIPT_URL: &str =
    "https://cdn.jsdelivr.net/npm/@airbyte-embedded/airbyte-embedded-widget@0.4.2";

/// Widget script URL, overridable at build time via `EMBED_WIDGET_CDN_URL`
pub const WIDGET_SCRIPT_URL: &str = match option_env!("EMBED_WIDGET_CDN_URL") {
    Some(url) => url,
    None => DEFAULT_WIDGET_SCRIPT_URL,
};

/// Document template; `{{WIDGET_SCRIPT_URL}}` is the only placeholder
pub const WIDGET_HTML: &str = include_str!("../assets/widget.html");

static RENDERED_WIDGET: OnceLock<String> = OnceLock::new();

/// The widget document with the script URL substituted
pub fn widget_document() -> &'static str {
    RENDERED_WIDGET.get_or_init(|| WIDGET_HTML.replace("{{WIDGET_SCRIPT_URL}}", WIDGET_SCRIPT_URL))
}

/// Content-security-policy hints for sandboxed rendering
pub fn widget_csp() -> Value {
    json!({
        "resourceDomains": ["https://cdn.jsdelivr.net"],
        "connectDomains": ["https://api.airbyte.ai", "https://cloud.airbyte.com"],
        "frameDomains": ["https://*.airbyte.ai", "https://cloud.airbyte.com"]
    })
}

fn widget_meta() -> Value {
    json!({
        "ui": {
            "csp": widget_csp(),
            "prefersBorder": true
        }
    })
}

/// Resource registry
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    resources: Vec<ResourceInfo>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        let resources = vec![ResourceInfo {
            uri: WIDGET_RESOURCE_URI.to_string(),
            name: "Airbyte Embedded Widget".to_string(),
            description: Some(
                "Sandboxed page that opens the Airbyte connector widget with a widget token"
                    .to_string(),
            ),
            mime_type: Some(WIDGET_MIME_TYPE.to_string()),
            meta: Some(widget_meta()),
        }];
        Self { resources }
    }

    pub fn list_resources(&self) -> &[ResourceInfo] {
        &self.resources
    }

    pub fn get_resource(&self, uri: &str) -> Option<&ResourceInfo> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    pub fn read_resource(&self, uri: &str) -> Option<ResourceContents> {
        let info = self.get_resource(uri)?;
        let text = match info.uri.as_str() {
            WIDGET_RESOURCE_URI => widget_document(),
            _ => return None,
        };
        Some(ResourceContents {
            uri: info.uri.clone(),
            mime_type: info.mime_type.clone(),
            text: text.to_string(),
            meta: info.meta.clone(),
        })
    }
}
