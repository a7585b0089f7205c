//! The `open-airbyte-widget` tool

use crate::protocol::{ToolInfo, ToolResult};
use crate::resources::WIDGET_RESOURCE_URI;
use embed_token::{TokenOutcome, WidgetTokenSource};
use serde_json::{json, Value};
use tracing::{info, warn};

pub const OPEN_WIDGET_TOOL: &str = "open-airbyte-widget";

/// Key of the token inside `structuredContent`
pub const WIDGET_TOKEN_FIELD: &str = "widgetToken";

pub const OPEN_WIDGET_CONFIRMATION: &str =
    "Opening the Airbyte widget so you can connect a data source.";

pub fn open_widget_descriptor() -> ToolInfo {
    ToolInfo {
        name: OPEN_WIDGET_TOOL.to_string(),
        description: Some(
            "Open the Airbyte Embedded widget so the user can add or manage data source \
             connectors (e.g. Gong, HubSpot). Takes no arguments."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
        output_schema: Some(json!({
            "type": "object",
            "properties": {
                WIDGET_TOKEN_FIELD: { "type": "string" }
            },
            "required": [WIDGET_TOKEN_FIELD]
        })),
        meta: Some(json!({
            "ui": { "resourceUri": WIDGET_RESOURCE_URI }
        })),
    }
}

/// Run a fresh exchange and shape it as a tool result.
///
/// Never fails: exchange errors become `isError` results.
pub async fn open_widget(source: &dyn WidgetTokenSource) -> ToolResult {
    match source.issue().await {
        TokenOutcome::Issued(token) => {
            info!(tool = OPEN_WIDGET_TOOL, "Widget token ready");
            ToolResult::success(
                OPEN_WIDGET_CONFIRMATION,
                json!({ WIDGET_TOKEN_FIELD: token.as_str() }),
            )
        }
        TokenOutcome::Failed(failure) => {
            warn!(tool = OPEN_WIDGET_TOOL, kind = ?failure.kind, "Widget tool failed");
            ToolResult::failure(failure.message)
        }
    }
}

/// Pull the widget token back out of a tool result's structured content
pub fn widget_token_from(structured: Option<&Value>) -> Option<&str> {
    structured?
        .get(WIDGET_TOKEN_FIELD)?
        .as_str()
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embed_core::ErrorKind;
    use embed_token::{ExchangeFailure, WidgetToken};

    struct Fixed(TokenOutcome);

    #[async_trait::async_trait]
    impl WidgetTokenSource for Fixed {
        async fn issue(&self) -> TokenOutcome {
            self.0.clone()
        }
    }

    #[test]
    fn test_descriptor_schemas() {
        let tool = open_widget_descriptor();
        assert_eq!(tool.name, "open-airbyte-widget");
        assert_eq!(tool.input_schema["properties"], json!({}));
        assert_eq!(
            tool.output_schema.unwrap()["properties"]["widgetToken"]["type"],
            json!("string")
        );
        assert_eq!(tool.meta.unwrap()["ui"]["resourceUri"], json!(WIDGET_RESOURCE_URI));
    }

    #[tokio::test]
    async fn test_success_carries_structured_token() {
        let source = Fixed(TokenOutcome::Issued(WidgetToken::new("xyz")));
        let result = open_widget(&source).await;
        assert!(!result.is_error);
        assert_eq!(widget_token_from(result.structured_content.as_ref()), Some("xyz"));
        assert_eq!(result.text(), OPEN_WIDGET_CONFIRMATION);
    }

    #[tokio::test]
    async fn test_failure_is_error_result() {
        let source = Fixed(TokenOutcome::Failed(ExchangeFailure {
            kind: ErrorKind::Authentication,
            message: "Authentication failed: 401".to_string(),
        }));
        let result = open_widget(&source).await;
        assert!(result.is_error);
        assert!(result.structured_content.is_none());
        assert_eq!(result.text(), "Authentication failed: 401");
    }

    #[test]
    fn test_token_extraction_rejects_empty() {
        let empty = json!({ "widgetToken": "" });
        assert_eq!(widget_token_from(Some(&empty)), None);
        assert_eq!(widget_token_from(None), None);
    }
}
