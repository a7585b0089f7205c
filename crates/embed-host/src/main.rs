//! embed-host: Host Process
//!
//!   embed-host serve --bind 127.0.0.1:8000   # web front end
//!   embed-host tools                          # print the cached tool list
//!   embed-host open                           # one widget request, headless renderer
//!
//! Servers come from `.mcp.json` (or `--config`). Without a registry file the
//! widget server runs in-process from `AC_*` settings. Failing to connect at
//! startup exits non-zero.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use embed_core::logging;
use embed_host::{
    connect, web, AppState, ChannelSurface, HostSession, LoggingWidgetFactory, OpenOutcome,
    ServerRegistry, TokenHandoff, DEFAULT_REGISTRY_FILE,
};
use embed_mcp::SERVER_NAME;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "embed-host")]
#[command(about = "Host for the embedded connector widget")]
struct Cli {
    /// Server registry file
    #[arg(long, global = true, default_value = DEFAULT_REGISTRY_FILE)]
    config: PathBuf,

    /// Registry entry to use when several are defined
    #[arg(long, global = true)]
    server: Option<String>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web front end
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
    /// List the widget server's tools
    Tools,
    /// Open the widget once through the in-process renderer
    Open {
        /// Hand the token over inside the tool result instead of directly
        #[arg(long)]
        via_tool_result: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_file = embed_core::load_environment();
    logging::init_tracing(&logging::directives_for(&cli.log_level))?;
    if let Some(path) = env_file {
        info!(path = %path, "Loaded environment file");
    }

    let registry = if cli.config.exists() {
        ServerRegistry::load(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "No server registry; running the widget server in-process");
        ServerRegistry::in_process(SERVER_NAME)
    };

    let (name, entry) = registry.select(cli.server.as_deref())?;
    let connection = connect(name, entry, None)
        .await
        .with_context(|| format!("Cannot connect to widget server {}", name))?;

    let mut session = HostSession::new(connection);
    session
        .connect()
        .await
        .with_context(|| format!("Widget server {} failed to initialize", name))?;

    match cli.command {
        Command::Serve { bind } => {
            let state = Arc::new(AppState::new(session));
            web::serve(state, bind).await
        }
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(session.tools())?);
            session.close().await?;
            Ok(())
        }
        Command::Open { via_tool_result } => open_once(session, via_tool_result).await,
    }
}

async fn open_once(session: HostSession, via_tool_result: bool) -> Result<()> {
    let (host, renderer) = embed_renderer::channel();
    let renderer_task = tokio::spawn(renderer.run(LoggingWidgetFactory));

    let handoff = if via_tool_result {
        TokenHandoff::ToolResult
    } else {
        TokenHandoff::Direct
    };
    let mut surface = ChannelSurface::new(host).with_handoff(handoff);

    let outcome = session.open_widget(&mut surface).await;
    let mut host = surface.into_endpoint();

    match &outcome {
        Ok(OpenOutcome::Rendered { message, .. }) => println!("{}", message),
        Ok(OpenOutcome::Failed { message }) => println!("Error: {}", message),
        Err(e) => warn!(error = %e, "Widget request failed"),
    }

    host.send(embed_renderer::HostMessage::Teardown)?;
    while let Some(message) = host.recv().await {
        info!(target: "embed_host::widget_events", message = ?message, "Renderer message");
        if message == embed_renderer::RendererMessage::TornDown {
            break;
        }
    }
    let final_state = renderer_task.await?;
    info!(state = ?final_state, "Renderer finished");

    session.close().await?;
    outcome.map(|_| ()).map_err(Into::into)
}
