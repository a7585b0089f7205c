//! Renderer state machine
//!
//! ```text
//! uninitialized → awaiting_token → token_received → widget_open → torn_down
//!                       │                 │
//!                       └──── error ◀─────┘
//! ```
//!
//! `error` is a terminal display state: the renderer reports it to the host
//! and keeps running so a teardown can still be delivered.

use crate::message::{HostMessage, RendererMessage};
use crate::widget::{EmbeddedWidget, EventSink, WidgetFactory, WidgetOptions};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const MISSING_TOKEN_MESSAGE: &str = "No widget token received";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    AwaitingToken,
    TokenReceived,
    WidgetOpen,
    TornDown,
    Error(String),
}

impl RendererState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RendererState::TornDown)
    }
}

pub struct Renderer<F: WidgetFactory> {
    factory: F,
    state: RendererState,
    widget: Option<Box<dyn EmbeddedWidget>>,
    outbound: mpsc::UnboundedSender<RendererMessage>,
}

impl<F: WidgetFactory> Renderer<F> {
    pub fn new(factory: F, outbound: mpsc::UnboundedSender<RendererMessage>) -> Self {
        Self {
            factory,
            state: RendererState::Uninitialized,
            widget: None,
            outbound,
        }
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    /// Document loaded; start listening for a token
    pub fn start(&mut self) {
        if self.state == RendererState::Uninitialized {
            self.state = RendererState::AwaitingToken;
        }
    }

    /// Single entry point for everything the host sends
    pub fn dispatch(&mut self, message: HostMessage) {
        debug!(message = ?message_kind(&message), state = ?self.state, "Renderer dispatch");
        match message {
            HostMessage::Teardown => self.teardown(),
            other => {
                let token = other.token().map(str::to_string);
                self.receive_token(token);
            }
        }
    }

    fn receive_token(&mut self, token: Option<String>) {
        self.start();
        if self.state != RendererState::AwaitingToken {
            debug!(state = ?self.state, "Ignoring token outside awaiting_token");
            return;
        }

        let Some(token) = token else {
            self.fail(MISSING_TOKEN_MESSAGE.to_string());
            return;
        };

        self.state = RendererState::TokenReceived;
        let events = EventSink::new(self.outbound.clone());
        let mut widget = match self.factory.create(WidgetOptions { token }, events) {
            Ok(widget) => widget,
            Err(e) => return self.fail(e.to_string()),
        };
        let opened = widget.open();
        // Kept even when open fails so teardown still destroys it
        self.widget = Some(widget);

        match opened {
            Ok(()) => {
                self.state = RendererState::WidgetOpen;
                info!("Widget open");
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn teardown(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(mut widget) = self.widget.take() {
            if let Err(e) = widget.destroy() {
                warn!(error = %e, "Widget destroy failed");
            }
        }
        self.state = RendererState::TornDown;
        let _ = self.outbound.send(RendererMessage::TornDown);
        info!("Renderer torn down");
    }

    fn fail(&mut self, message: String) {
        warn!(error = %message, "Render error");
        self.state = RendererState::Error(message.clone());
        let _ = self.outbound.send(RendererMessage::RenderError { message });
    }
}

fn message_kind(message: &HostMessage) -> &'static str {
    match message {
        HostMessage::WidgetToken { .. } => "widget-token",
        HostMessage::ToolResult { .. } => "tool-result",
        HostMessage::Teardown => "teardown",
    }
}
