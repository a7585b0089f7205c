//! Stdio Transport
//!
//! Newline-delimited JSON-RPC over stdin/stdout.

use super::{HandlerFactory, McpHandler, Transport};
use crate::{JsonRpcError, McpRequest, McpResponse};
use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

/// Stdio transport - reads JSON-RPC from stdin, writes to stdout
#[derive(Default)]
pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn serve<F: HandlerFactory + 'static>(self, factory: Arc<F>) -> Result<()> {
        info!("Starting MCP stdio transport");
        let handler = factory.create();
        let stdin = BufReader::new(tokio::io::stdin());
        serve_lines(&handler, stdin, tokio::io::stdout()).await?;
        info!("Stdio transport shutting down");
        Ok(())
    }
}

/// Answer each request line until the reader hits EOF
pub async fn serve_lines<H, R, W>(handler: &H, reader: R, mut writer: W) -> Result<()>
where
    H: McpHandler + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        debug!(request = %line, "Received request");

        let response = match serde_json::from_str::<McpRequest>(line) {
            Ok(request) if request.is_notification() => {
                handler.handle_request(request).await;
                continue;
            }
            Ok(request) => handler.handle_request(request).await,
            Err(e) => {
                error!(error = %e, "Parse error");
                McpResponse::error(None, JsonRpcError::parse_error(e.to_string()))
            }
        };

        let response_json = serde_json::to_string(&response)?;
        debug!(bytes = response_json.len(), "Sending response");

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
