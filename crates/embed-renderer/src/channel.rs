//! In-process message channel between host and renderer
//!
//! Each side owns one endpoint and never touches the other's state.

use crate::message::{HostMessage, RendererMessage};
use crate::renderer::{Renderer, RendererState};
use crate::widget::WidgetFactory;
use embed_core::{Error, Result};
use tokio::sync::mpsc;
use tracing::debug;

/// Create a connected pair of endpoints
pub fn channel() -> (HostEndpoint, RendererEndpoint) {
    let (to_renderer, inbox) = mpsc::unbounded_channel();
    let (outbox, from_renderer) = mpsc::unbounded_channel();
    (
        HostEndpoint {
            to_renderer,
            from_renderer,
        },
        RendererEndpoint { inbox, outbox },
    )
}

pub struct HostEndpoint {
    to_renderer: mpsc::UnboundedSender<HostMessage>,
    from_renderer: mpsc::UnboundedReceiver<RendererMessage>,
}

impl HostEndpoint {
    pub fn send(&self, message: HostMessage) -> Result<()> {
        self.to_renderer
            .send(message)
            .map_err(|_| Error::render("Renderer is gone"))
    }

    pub async fn recv(&mut self) -> Option<RendererMessage> {
        self.from_renderer.recv().await
    }
}

pub struct RendererEndpoint {
    inbox: mpsc::UnboundedReceiver<HostMessage>,
    outbox: mpsc::UnboundedSender<RendererMessage>,
}

impl RendererEndpoint {
    /// Drive a renderer until it is torn down or the host disconnects.
    ///
    /// A host disconnect counts as navigation away and tears the widget down.
    pub async fn run<F: WidgetFactory>(mut self, factory: F) -> RendererState {
        let mut renderer = Renderer::new(factory, self.outbox.clone());
        renderer.start();

        while let Some(message) = self.inbox.recv().await {
            renderer.dispatch(message);
            if renderer.state().is_terminal() {
                return renderer.state().clone();
            }
        }

        debug!("Host endpoint closed");
        renderer.dispatch(HostMessage::Teardown);
        renderer.state().clone()
    }
}
