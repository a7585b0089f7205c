//! embed-mcp-server: Widget Resource Server
//!
//!   embed-mcp-server                      # stdio (spawned by a host)
//!   embed-mcp-server --http 0.0.0.0:3001  # stateless HTTP
//!
//! Credentials come from `AC_AIRBYTE_CLIENT_ID` / `AC_AIRBYTE_CLIENT_SECRET`
//! (optionally via `.env`). Missing credentials exit non-zero.

use anyhow::{Context, Result};
use clap::Parser;
use embed_core::{logging, ExchangeSettings};
use embed_mcp::transport::{HttpTransport, StdioTransport, Transport};
use embed_mcp::WidgetContext;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "embed-mcp-server")]
#[command(about = "MCP server exposing the Airbyte embedded widget")]
struct Cli {
    /// Run stdio transport (default if no network transport specified)
    #[arg(long)]
    stdio: bool,

    /// Run stateless HTTP transport on specified address
    #[arg(long, value_name = "ADDR")]
    http: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Server name override
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    embed_core::load_environment();
    logging::init_tracing(&logging::directives_for(&cli.log_level))?;

    let settings = ExchangeSettings::load().context("Failed to load exchange settings")?;
    let mut context = WidgetContext::from_settings(settings).context("Cannot start widget server")?;
    if let Some(name) = cli.name {
        context = context.with_name(name);
    }
    let context = Arc::new(context);

    info!(server = %context.name(), "Widget MCP server initialized");

    match cli.http {
        Some(addr) if !cli.stdio => HttpTransport::new(addr).serve(context).await,
        Some(addr) => {
            let http_context = context.clone();
            let http = tokio::spawn(async move { HttpTransport::new(addr).serve(http_context).await });
            run_stdio(context).await?;
            http.abort();
            Ok(())
        }
        None => run_stdio(context).await,
    }
}

/// Stdio ends on EOF or on SIGINT/SIGTERM, whichever comes first
async fn run_stdio(context: Arc<WidgetContext>) -> Result<()> {
    tokio::select! {
        result = StdioTransport::new().serve(context) => result,
        _ = embed_core::shutdown_signal() => Ok(()),
    }
}
