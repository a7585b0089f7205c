//! Third-party widget abstraction

use crate::message::RendererMessage;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct WidgetError(pub String);

/// Constructor arguments for the widget
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetOptions {
    pub token: String,
}

/// Callback handed to the widget for its lifecycle events
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<RendererMessage>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<RendererMessage>) -> Self {
        Self { tx }
    }

    /// Forward an event to the host. Dropped silently if the host is gone.
    pub fn emit(&self, event: Value) {
        let _ = self.tx.send(RendererMessage::WidgetEvent { event });
    }
}

/// A constructed widget instance
pub trait EmbeddedWidget: Send {
    fn open(&mut self) -> Result<(), WidgetError>;

    /// Destroy hook; widgets without one keep the default no-op
    fn destroy(&mut self) -> Result<(), WidgetError> {
        Ok(())
    }
}

/// Builds widget instances (the `new AirbyteEmbeddedWidget(..)` call)
pub trait WidgetFactory: Send + Sync {
    fn create(
        &self,
        options: WidgetOptions,
        events: EventSink,
    ) -> Result<Box<dyn EmbeddedWidget>, WidgetError>;
}
