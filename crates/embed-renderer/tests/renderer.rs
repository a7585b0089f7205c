//! Renderer state machine and channel tests

use embed_renderer::{
    channel, EmbeddedWidget, EventSink, HostMessage, Renderer, RendererMessage, RendererState,
    WidgetError, WidgetFactory, WidgetOptions, MISSING_TOKEN_MESSAGE,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct Calls {
    constructed: Vec<WidgetOptions>,
    opened: usize,
    destroyed: usize,
}

#[derive(Clone, Default)]
struct RecordingFactory {
    calls: Arc<Mutex<Calls>>,
    fail_construct: bool,
    fail_open: bool,
    fail_destroy: bool,
    emit_on_open: bool,
}

struct RecordingWidget {
    calls: Arc<Mutex<Calls>>,
    events: EventSink,
    fail_open: bool,
    fail_destroy: bool,
    emit_on_open: bool,
}

impl EmbeddedWidget for RecordingWidget {
    fn open(&mut self) -> Result<(), WidgetError> {
        self.calls.lock().unwrap().opened += 1;
        if self.fail_open {
            return Err(WidgetError("iframe refused to load".into()));
        }
        if self.emit_on_open {
            self.events.emit(json!({"type": "source_created"}));
        }
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), WidgetError> {
        self.calls.lock().unwrap().destroyed += 1;
        if self.fail_destroy {
            return Err(WidgetError("already gone".into()));
        }
        Ok(())
    }
}

impl WidgetFactory for RecordingFactory {
    fn create(
        &self,
        options: WidgetOptions,
        events: EventSink,
    ) -> Result<Box<dyn EmbeddedWidget>, WidgetError> {
        self.calls.lock().unwrap().constructed.push(options);
        if self.fail_construct {
            return Err(WidgetError("widget script failed to load".into()));
        }
        Ok(Box::new(RecordingWidget {
            calls: self.calls.clone(),
            events,
            fail_open: self.fail_open,
            fail_destroy: self.fail_destroy,
            emit_on_open: self.emit_on_open,
        }))
    }
}

fn renderer(
    factory: RecordingFactory,
) -> (
    Renderer<RecordingFactory>,
    mpsc::UnboundedReceiver<RendererMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut renderer = Renderer::new(factory, tx);
    renderer.start();
    (renderer, rx)
}

#[test]
fn test_token_constructs_and_opens_once() {
    let factory = RecordingFactory::default();
    let calls = factory.calls.clone();
    let (mut renderer, _rx) = renderer(factory);

    let msg: HostMessage =
        serde_json::from_value(json!({"type": "widget-token", "token": "xyz"})).unwrap();
    renderer.dispatch(msg);

    assert_eq!(renderer.state(), &RendererState::WidgetOpen);
    let calls = calls.lock().unwrap();
    assert_eq!(
        calls.constructed,
        vec![WidgetOptions {
            token: "xyz".into()
        }]
    );
    assert_eq!(calls.opened, 1);
}

#[test]
fn test_second_token_ignored() {
    let factory = RecordingFactory::default();
    let calls = factory.calls.clone();
    let (mut renderer, _rx) = renderer(factory);

    renderer.dispatch(HostMessage::widget_token("first"));
    renderer.dispatch(HostMessage::widget_token("second"));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.constructed.len(), 1);
    assert_eq!(calls.opened, 1);
}

#[test]
fn test_tool_result_carries_token() {
    let factory = RecordingFactory::default();
    let calls = factory.calls.clone();
    let (mut renderer, _rx) = renderer(factory);

    renderer.dispatch(HostMessage::ToolResult {
        result: json!({
            "content": [{"type": "text", "text": "Widget token issued."}],
            "structuredContent": {"widgetToken": "from-result"},
            "isError": false
        }),
    });

    assert_eq!(renderer.state(), &RendererState::WidgetOpen);
    assert_eq!(calls.lock().unwrap().constructed[0].token, "from-result");
}

#[test]
fn test_tool_result_without_token_is_render_error() {
    let factory = RecordingFactory::default();
    let calls = factory.calls.clone();
    let (mut renderer, mut rx) = renderer(factory);

    renderer.dispatch(HostMessage::ToolResult {
        result: json!({"content": [], "isError": true}),
    });

    assert_eq!(
        renderer.state(),
        &RendererState::Error(MISSING_TOKEN_MESSAGE.to_string())
    );
    assert!(calls.lock().unwrap().constructed.is_empty());
    assert_eq!(
        rx.try_recv().unwrap(),
        RendererMessage::RenderError {
            message: MISSING_TOKEN_MESSAGE.to_string()
        }
    );
}

#[test]
fn test_constructor_failure_reported() {
    let factory = RecordingFactory {
        fail_construct: true,
        ..Default::default()
    };
    let (mut renderer, mut rx) = renderer(factory);

    renderer.dispatch(HostMessage::widget_token("xyz"));

    assert!(matches!(renderer.state(), RendererState::Error(_)));
    match rx.try_recv().unwrap() {
        RendererMessage::RenderError { message } => {
            assert_eq!(message, "widget script failed to load")
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_open_failure_still_destroyed_on_teardown() {
    let factory = RecordingFactory {
        fail_open: true,
        ..Default::default()
    };
    let calls = factory.calls.clone();
    let (mut renderer, mut rx) = renderer(factory);

    renderer.dispatch(HostMessage::widget_token("xyz"));
    assert_eq!(
        renderer.state(),
        &RendererState::Error("iframe refused to load".into())
    );
    assert!(matches!(
        rx.try_recv().unwrap(),
        RendererMessage::RenderError { .. }
    ));

    renderer.dispatch(HostMessage::Teardown);
    assert_eq!(renderer.state(), &RendererState::TornDown);
    assert_eq!(calls.lock().unwrap().destroyed, 1);
    assert_eq!(rx.try_recv().unwrap(), RendererMessage::TornDown);
}

#[test]
fn test_teardown_without_widget() {
    let factory = RecordingFactory::default();
    let calls = factory.calls.clone();
    let (mut renderer, mut rx) = renderer(factory);

    renderer.dispatch(HostMessage::Teardown);

    assert_eq!(renderer.state(), &RendererState::TornDown);
    assert_eq!(calls.lock().unwrap().destroyed, 0);
    assert_eq!(rx.try_recv().unwrap(), RendererMessage::TornDown);
}

#[test]
fn test_teardown_destroys_widget_once() {
    let factory = RecordingFactory::default();
    let calls = factory.calls.clone();
    let (mut renderer, _rx) = renderer(factory);

    renderer.dispatch(HostMessage::widget_token("xyz"));
    renderer.dispatch(HostMessage::Teardown);
    renderer.dispatch(HostMessage::Teardown);

    assert_eq!(renderer.state(), &RendererState::TornDown);
    assert_eq!(calls.lock().unwrap().destroyed, 1);
}

#[test]
fn test_destroy_failure_still_tears_down() {
    let factory = RecordingFactory {
        fail_destroy: true,
        ..Default::default()
    };
    let (mut renderer, mut rx) = renderer(factory);

    renderer.dispatch(HostMessage::widget_token("xyz"));
    renderer.dispatch(HostMessage::Teardown);

    assert_eq!(renderer.state(), &RendererState::TornDown);
    assert_eq!(rx.try_recv().unwrap(), RendererMessage::TornDown);
}

#[tokio::test]
async fn test_channel_forwards_widget_events() {
    let factory = RecordingFactory {
        emit_on_open: true,
        ..Default::default()
    };
    let calls = factory.calls.clone();
    let (mut host, renderer) = channel();
    let task = tokio::spawn(renderer.run(factory));

    host.send(HostMessage::widget_token("xyz")).unwrap();
    assert_eq!(
        host.recv().await.unwrap(),
        RendererMessage::WidgetEvent {
            event: json!({"type": "source_created"})
        }
    );

    host.send(HostMessage::Teardown).unwrap();
    assert_eq!(host.recv().await.unwrap(), RendererMessage::TornDown);
    assert_eq!(task.await.unwrap(), RendererState::TornDown);
    assert_eq!(calls.lock().unwrap().destroyed, 1);
}

#[tokio::test]
async fn test_host_disconnect_tears_down() {
    let factory = RecordingFactory::default();
    let calls = factory.calls.clone();
    let (host, renderer) = channel();
    let task = tokio::spawn(renderer.run(factory));

    host.send(HostMessage::widget_token("xyz")).unwrap();
    drop(host);

    assert_eq!(task.await.unwrap(), RendererState::TornDown);
    assert_eq!(calls.lock().unwrap().destroyed, 1);
}
