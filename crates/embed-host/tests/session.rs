//! Host session against an in-process widget server and a mocked upstream

use embed_core::{Error, ErrorKind, Result};
use embed_host::{
    ChannelSurface, HostSession, HostState, InProcessConnection, OpenOutcome, ServerConnection,
    TokenHandoff,
};
use embed_mcp::{McpRequest, McpResponse, WidgetContext, OPEN_WIDGET_TOOL};
use embed_renderer::{
    channel, EmbeddedWidget, EventSink, HostEndpoint, RendererMessage, RendererState,
    WidgetError, WidgetFactory, WidgetOptions,
};
use embed_token::testing::{MockAirbyte, MockReply};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

fn in_process(mock: &MockAirbyte) -> InProcessConnection {
    InProcessConnection::new(WidgetContext::from_settings(mock.settings()).unwrap())
}

async fn connected(mock: &MockAirbyte) -> HostSession {
    let mut session = HostSession::new(Box::new(in_process(mock)));
    session.connect().await.unwrap();
    session
}

/// Counts requests per method before passing them on
struct CountingConnection {
    inner: InProcessConnection,
    tools_list: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ServerConnection for CountingConnection {
    async fn request(&self, request: McpRequest) -> Result<McpResponse> {
        if request.method == "tools/list" {
            self.tools_list.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.request(request).await
    }

    async fn notify(&self, notification: McpRequest) -> Result<()> {
        self.inner.notify(notification).await
    }

    fn describe(&self) -> String {
        "counting".into()
    }
}

/// Refuses every request, like a server that never came up
struct DeadConnection;

#[async_trait::async_trait]
impl ServerConnection for DeadConnection {
    async fn request(&self, _request: McpRequest) -> Result<McpResponse> {
        Err(Error::connection("connection refused"))
    }

    async fn notify(&self, _notification: McpRequest) -> Result<()> {
        Err(Error::connection("connection refused"))
    }

    fn describe(&self) -> String {
        "dead".into()
    }
}

#[derive(Clone, Default)]
struct RecordingFactory {
    tokens: Arc<Mutex<Vec<String>>>,
}

struct RecordingWidget;

impl EmbeddedWidget for RecordingWidget {
    fn open(&mut self) -> std::result::Result<(), WidgetError> {
        Ok(())
    }
}

impl WidgetFactory for RecordingFactory {
    fn create(
        &self,
        options: WidgetOptions,
        _events: EventSink,
    ) -> std::result::Result<Box<dyn EmbeddedWidget>, WidgetError> {
        self.tokens.lock().unwrap().push(options.token);
        Ok(Box::new(RecordingWidget))
    }
}

fn spawn_renderer(factory: RecordingFactory) -> (HostEndpoint, JoinHandle<RendererState>) {
    let (host, renderer) = channel();
    (host, tokio::spawn(renderer.run(factory)))
}

async fn finish(mut host: HostEndpoint, task: JoinHandle<RendererState>) -> RendererState {
    host.send(embed_renderer::HostMessage::Teardown).unwrap();
    while let Some(message) = host.recv().await {
        if message == RendererMessage::TornDown {
            break;
        }
    }
    task.await.unwrap()
}

#[tokio::test]
async fn test_connect_caches_tools() {
    let mock = MockAirbyte::start().await;
    let session = connected(&mock).await;

    assert_eq!(session.state(), HostState::Connected);
    assert_eq!(session.tools().len(), 1);
    assert_eq!(session.tools()[0].name, OPEN_WIDGET_TOOL);
    assert_eq!(session.server_info().unwrap()["name"], "airbyte-widget");
    assert_eq!(session.widget_resource_uri(), "ui://airbyte/widget.html");
}

#[tokio::test]
async fn test_tools_listed_once_per_session() {
    let mock = MockAirbyte::start().await;
    let tools_list = Arc::new(AtomicUsize::new(0));
    let mut session = HostSession::new(Box::new(CountingConnection {
        inner: in_process(&mock),
        tools_list: tools_list.clone(),
    }));
    session.connect().await.unwrap();

    let (host, task) = spawn_renderer(RecordingFactory::default());
    let mut surface = ChannelSurface::new(host);
    session.open_widget(&mut surface).await.unwrap();
    session.open_widget(&mut surface).await.unwrap();

    assert_eq!(tools_list.load(Ordering::SeqCst), 1);
    finish(surface.into_endpoint(), task).await;
}

#[tokio::test]
async fn test_connect_failure_is_fatal() {
    let mut session = HostSession::new(Box::new(DeadConnection));
    let err = session.connect().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.is_fatal());
    assert!(matches!(
        session.state(),
        HostState::Error {
            recoverable: false,
            ..
        }
    ));

    let mut surface = embed_host::BrowserSurface::new();
    assert!(session.open_widget(&mut surface).await.is_err());
}

#[tokio::test]
async fn test_open_widget_delivers_token_to_renderer() {
    let mock = MockAirbyte::with_replies(MockReply::token("A"), MockReply::token("xyz")).await;
    let session = connected(&mock).await;

    let factory = RecordingFactory::default();
    let tokens = factory.tokens.clone();
    let (host, task) = spawn_renderer(factory);
    let mut surface = ChannelSurface::new(host);

    let outcome = session.open_widget(&mut surface).await.unwrap();
    match &outcome {
        OpenOutcome::Rendered { message, delivery } => {
            assert_eq!(message, embed_mcp::tools::OPEN_WIDGET_CONFIRMATION);
            assert_eq!(delivery.token, "xyz");
            assert_eq!(delivery.mime_type.as_deref(), Some("text/html;profile=mcp-app"));
            assert!(delivery.html.contains("AirbyteEmbeddedWidget"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(session.state(), HostState::Connected);

    assert_eq!(finish(surface.into_endpoint(), task).await, RendererState::TornDown);
    assert_eq!(*tokens.lock().unwrap(), vec!["xyz".to_string()]);
}

#[tokio::test]
async fn test_tool_result_handoff() {
    let mock = MockAirbyte::with_replies(MockReply::token("A"), MockReply::token("via-result")).await;
    let session = connected(&mock).await;

    let factory = RecordingFactory::default();
    let tokens = factory.tokens.clone();
    let (host, task) = spawn_renderer(factory);
    let mut surface = ChannelSurface::new(host).with_handoff(TokenHandoff::ToolResult);

    assert!(session.open_widget(&mut surface).await.unwrap().is_rendered());
    finish(surface.into_endpoint(), task).await;
    assert_eq!(*tokens.lock().unwrap(), vec!["via-result".to_string()]);
}

#[tokio::test]
async fn test_auth_failure_is_recoverable() {
    let mock = MockAirbyte::with_replies(MockReply::status(401), MockReply::token("B")).await;
    let session = connected(&mock).await;
    let mut surface = embed_host::BrowserSurface::new();

    let outcome = session.open_widget(&mut surface).await.unwrap();
    assert!(!outcome.is_rendered());
    assert_eq!(outcome.message(), "Authentication failed: 401");
    assert_eq!(mock.widget_hits(), 0);
    assert!(surface.take().is_none());
    assert_eq!(
        session.state(),
        HostState::Error {
            message: "Authentication failed: 401".into(),
            recoverable: true
        }
    );

    mock.set_application_reply(MockReply::token("A"));
    let outcome = session.open_widget(&mut surface).await.unwrap();
    assert!(outcome.is_rendered());
    assert_eq!(surface.take().unwrap().token, "B");
    assert_eq!(session.state(), HostState::Connected);
}

#[tokio::test]
async fn test_dropped_request_leaves_session_usable() {
    let mock = MockAirbyte::with_replies(
        MockReply::token("A").delayed(Duration::from_secs(2)),
        MockReply::token("B"),
    )
    .await;
    let session = connected(&mock).await;
    let mut surface = embed_host::BrowserSurface::new();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), session.open_widget(&mut surface)).await;
    assert!(abandoned.is_err());
    assert_eq!(
        session.state(),
        HostState::Error {
            message: embed_host::session::CANCELLED_MESSAGE.into(),
            recoverable: true
        }
    );

    mock.set_application_reply(MockReply::token("A"));
    let outcome = session.open_widget(&mut surface).await.unwrap();
    assert!(outcome.is_rendered());
    assert_eq!(surface.take().unwrap().token, "B");
    assert_eq!(session.state(), HostState::Connected);
}

#[tokio::test]
async fn test_requests_run_concurrently() {
    let mock = MockAirbyte::with_replies(
        MockReply::token("A").delayed(Duration::from_millis(400)),
        MockReply::token("B"),
    )
    .await;
    let session = connected(&mock).await;
    let mut first = embed_host::BrowserSurface::new();
    let mut second = embed_host::BrowserSurface::new();

    let started = Instant::now();
    let (a, b) = tokio::join!(session.open_widget(&mut first), session.open_widget(&mut second));
    let elapsed = started.elapsed();

    assert!(a.unwrap().is_rendered());
    assert!(b.unwrap().is_rendered());
    assert!(elapsed < Duration::from_millis(750), "took {elapsed:?}");
    assert_eq!(mock.application_hits(), 2);
    assert_eq!(session.state(), HostState::Connected);
}

#[tokio::test]
async fn test_every_request_runs_a_fresh_exchange() {
    let mock = MockAirbyte::start().await;
    let session = connected(&mock).await;
    let mut surface = embed_host::BrowserSurface::new();

    session.open_widget(&mut surface).await.unwrap();
    session.open_widget(&mut surface).await.unwrap();

    assert_eq!(mock.application_hits(), 2);
    assert_eq!(mock.widget_hits(), 2);
}

#[tokio::test]
async fn test_close_returns_to_idle() {
    let mock = MockAirbyte::start().await;
    let session = connected(&mock).await;
    session.close().await.unwrap();
    assert_eq!(session.state(), HostState::Idle);
}
