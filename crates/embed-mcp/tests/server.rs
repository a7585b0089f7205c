//! End-to-end request handling against a mocked upstream

use embed_mcp::transport::HandlerFactory;
use embed_mcp::{
    McpRequest, McpResponse, ToolResult, WidgetContext, WIDGET_MIME_TYPE, WIDGET_RESOURCE_URI,
};
use embed_token::testing::{MockAirbyte, MockReply};
use embed_token::TokenExchangeClient;
use serde_json::{json, Value};
use std::sync::Arc;

fn context_for(mock: &MockAirbyte) -> WidgetContext {
    WidgetContext::from_settings(mock.settings()).unwrap()
}

async fn call(context: &WidgetContext, method: &str, params: Option<Value>) -> McpResponse {
    let mut request = McpRequest::new(method).with_id(json!(1));
    if let Some(params) = params {
        request = request.with_params(params);
    }
    context.create().handle_request(request).await
}

#[tokio::test]
async fn test_initialize_reports_capabilities() {
    let mock = MockAirbyte::start().await;
    let response = call(
        &context_for(&mock),
        "initialize",
        Some(json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0.0" }
        })),
    )
    .await;

    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], json!("2025-06-18"));
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["resources"].is_object());
    assert_eq!(result["serverInfo"]["name"], json!("airbyte-widget"));
}

#[tokio::test]
async fn test_tools_list_exposes_exactly_one_tool() {
    let mock = MockAirbyte::start().await;
    let response = call(&context_for(&mock), "tools/list", None).await;

    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], json!("open-airbyte-widget"));
    assert_eq!(tools[0]["inputSchema"]["properties"], json!({}));
    assert_eq!(tools[0]["outputSchema"]["required"], json!(["widgetToken"]));
}

#[tokio::test]
async fn test_tool_call_returns_structured_token() {
    let mock = MockAirbyte::with_replies(MockReply::token("A"), MockReply::token("B")).await;
    let response = call(
        &context_for(&mock),
        "tools/call",
        Some(json!({ "name": "open-airbyte-widget", "arguments": {} })),
    )
    .await;

    let result: ToolResult = serde_json::from_value(response.result.unwrap()).unwrap();
    assert!(!result.is_error);
    assert_eq!(result.structured_content, Some(json!({ "widgetToken": "B" })));
    assert!(!result.text().is_empty());
}

#[tokio::test]
async fn test_tool_call_with_rejected_credentials() {
    let mock = MockAirbyte::with_replies(MockReply::status(401), MockReply::token("B")).await;
    let response = call(
        &context_for(&mock),
        "tools/call",
        Some(json!({ "name": "open-airbyte-widget", "arguments": {} })),
    )
    .await;

    assert!(response.is_success(), "tool failures are results, not JSON-RPC errors");
    let result: ToolResult = serde_json::from_value(response.result.unwrap()).unwrap();
    assert!(result.is_error);
    assert!(result.text().contains("Authentication failed: 401"));
    assert_eq!(mock.widget_hits(), 0);
}

#[tokio::test]
async fn test_each_call_is_a_fresh_exchange() {
    let mock = MockAirbyte::start().await;
    let context = context_for(&mock);
    let params = json!({ "name": "open-airbyte-widget" });

    call(&context, "tools/call", Some(params.clone())).await;
    call(&context, "tools/call", Some(params)).await;

    assert_eq!(mock.application_hits(), 2);
    assert_eq!(mock.widget_hits(), 2);
}

#[tokio::test]
async fn test_unknown_tool_and_bad_arguments() {
    let mock = MockAirbyte::start().await;
    let context = context_for(&mock);

    let response = call(&context, "tools/call", Some(json!({ "name": "open-gong" }))).await;
    assert_eq!(response.error.unwrap().code, -32602);

    let response = call(
        &context,
        "tools/call",
        Some(json!({ "name": "open-airbyte-widget", "arguments": [1, 2] })),
    )
    .await;
    assert_eq!(response.error.unwrap().code, -32602);

    let response = call(&context, "tools/call", None).await;
    assert_eq!(response.error.unwrap().code, -32602);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_resource_read_is_byte_identical() {
    let mock = MockAirbyte::start().await;
    let context = context_for(&mock);
    let params = json!({ "uri": WIDGET_RESOURCE_URI });

    let first = call(&context, "resources/read", Some(params.clone())).await.result.unwrap();
    let second = call(&context, "resources/read", Some(params)).await.result.unwrap();

    let first_text = first["contents"][0]["text"].as_str().unwrap();
    let second_text = second["contents"][0]["text"].as_str().unwrap();
    assert_eq!(first_text.as_bytes(), second_text.as_bytes());
    assert_eq!(first["contents"][0]["mimeType"], json!(WIDGET_MIME_TYPE));
    assert!(first["contents"][0]["_meta"]["ui"]["csp"].is_object());
}

#[tokio::test]
async fn test_resource_errors() {
    let mock = MockAirbyte::start().await;
    let context = context_for(&mock);

    let response = call(&context, "resources/read", Some(json!({ "uri": "ui://nope" }))).await;
    assert_eq!(response.error.unwrap().code, -32002);

    let response = call(&context, "resources/read", None).await;
    assert_eq!(response.error.unwrap().code, -32602);
}

#[tokio::test]
async fn test_resources_list() {
    let mock = MockAirbyte::start().await;
    let response = call(&context_for(&mock), "resources/list", None).await;

    let resources = response.result.unwrap()["resources"].as_array().unwrap().clone();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["uri"], json!(WIDGET_RESOURCE_URI));
}

#[tokio::test]
async fn test_unknown_method() {
    let mock = MockAirbyte::start().await;
    let response = call(&context_for(&mock), "unknown_method", None).await;

    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    assert!(error.message.contains("Method not found"));
}

#[tokio::test]
async fn test_missing_credentials_refuse_startup() {
    let mock = MockAirbyte::start().await;
    let mut settings = mock.settings();
    settings.airbyte_client_id = String::new();

    let err = WidgetContext::from_settings(settings).err().unwrap();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_context_accepts_custom_source() {
    let mock = MockAirbyte::start().await;
    let client = TokenExchangeClient::new(mock.settings()).unwrap();
    let context = WidgetContext::new(Arc::new(client)).with_name("custom");

    let response = call(&context, "initialize", None).await;
    assert_eq!(response.result.unwrap()["serverInfo"]["name"], json!("custom"));
}
