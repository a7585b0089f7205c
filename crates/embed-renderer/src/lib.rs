//! embed-renderer: Sandboxed Renderer protocol
//!
//! The renderer runs isolated from the host and talks to it only through
//! messages. This crate pins down that protocol:
//!
//! - [`message`]: the closed host→renderer and renderer→host message sets
//! - [`widget`]: the third-party widget seen as a factory + instance pair
//! - [`renderer`]: the renderer state machine with its single dispatch point
//! - [`channel`]: an in-process message channel joining host and renderer
//!
//! The browser implementation of the same protocol ships inside the widget
//! HTML resource served by `embed-mcp`.

pub mod channel;
pub mod message;
pub mod renderer;
pub mod widget;

pub use channel::{channel, HostEndpoint, RendererEndpoint};
pub use message::{HostMessage, RendererMessage};
pub use renderer::{Renderer, RendererState, MISSING_TOKEN_MESSAGE};
pub use widget::{EmbeddedWidget, EventSink, WidgetError, WidgetFactory, WidgetOptions};
