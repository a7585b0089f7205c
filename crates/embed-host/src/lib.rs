//! embed-host: Host Process
//!
//! Connects to the widget server, forwards "open widget" requests as tool
//! calls, and relays the widget document plus its token to a render surface.
//!
//! - [`registry`]: `.mcp.json` server registry
//! - [`connection`]: stdio, HTTP and in-process server connections
//! - [`state`]: the host state machine
//! - [`session`]: one connection driven through that state machine
//! - [`surface`]: browser and in-process render surfaces
//! - [`web`]: axum front end serving the chat-like page

pub mod connection;
pub mod registry;
pub mod session;
pub mod state;
pub mod surface;
pub mod web;

pub use connection::{connect, HttpConnection, InProcessConnection, ServerConnection, StdioConnection};
pub use registry::{ServerEntry, ServerRegistry, DEFAULT_REGISTRY_FILE};
pub use session::{HostSession, OpenOutcome};
pub use state::HostState;
pub use surface::{
    BrowserSurface, ChannelSurface, LoggingWidgetFactory, RenderSurface, TokenHandoff,
    WidgetDelivery,
};
pub use web::{create_router, AppState};
