//! Connections to the widget server
//!
//! Three ways to reach the same server:
//! - stdio: spawn it as a child process and speak newline-delimited JSON-RPC
//! - HTTP: POST each request to its stateless endpoint
//! - in-process: call a server built from this process's own settings

use crate::registry::ServerEntry;
use embed_core::{Error, ExchangeSettings, Result};
use embed_mcp::prelude::*;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Upper bound on one request/response exchange, for every transport
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait::async_trait]
pub trait ServerConnection: Send + Sync {
    /// Send a request and wait for its response
    async fn request(&self, request: McpRequest) -> Result<McpResponse>;

    /// Send a notification; nothing comes back
    async fn notify(&self, notification: McpRequest) -> Result<()>;

    /// Short label for logs
    fn describe(&self) -> String;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Open a connection for a registry entry
pub async fn connect(
    name: &str,
    entry: &ServerEntry,
    settings: Option<ExchangeSettings>,
) -> Result<Box<dyn ServerConnection>> {
    info!(server = %name, transport = entry.transport_name(), "Connecting to widget server");
    match entry {
        ServerEntry::Stdio { command, args, env } => {
            Ok(Box::new(StdioConnection::spawn(command, args, env).await?))
        }
        ServerEntry::Http { url, headers } => Ok(Box::new(HttpConnection::new(url, headers)?)),
        ServerEntry::InProcess { in_process: false } => Err(Error::configuration(format!(
            "Server {} has inProcess set to false",
            name
        ))),
        ServerEntry::InProcess { in_process: true } => {
            let settings = match settings {
                Some(s) => s,
                None => ExchangeSettings::load()?,
            };
            let context = WidgetContext::from_settings(settings)?.with_name(name);
            Ok(Box::new(InProcessConnection::new(context)))
        }
    }
}

// === stdio ===

struct Pipe {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Widget server running as a child process
pub struct StdioConnection {
    label: String,
    pipe: Mutex<Pipe>,
    child: Mutex<Child>,
    timeout: Duration,
}

impl StdioConnection {
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::connection(format!("Failed to spawn {}: {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::connection("Failed to open child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::connection("Failed to open child stdout"))?;

        debug!(command = %command, pid = ?child.id(), "Spawned widget server");

        Ok(Self {
            label: format!("stdio:{}", command),
            pipe: Mutex::new(Pipe {
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            child: Mutex::new(child),
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exchange(pipe: &mut Pipe, request: &McpRequest) -> Result<McpResponse> {
        Self::write_line(pipe, request).await?;

        loop {
            let line = pipe
                .stdout
                .next_line()
                .await
                .map_err(|e| Error::connection(format!("Read from widget server failed: {}", e)))?
                .ok_or_else(|| Error::connection("Widget server closed its output"))?;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response: McpResponse = match serde_json::from_str(line) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable line from widget server");
                    continue;
                }
            };

            if response.answers(request) {
                return Ok(response);
            }
            debug!(id = ?response.id, "Skipping response for another request");
        }
    }

    async fn write_line(pipe: &mut Pipe, message: &McpRequest) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        pipe.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::connection(format!("Write to widget server failed: {}", e)))?;
        pipe.stdin
            .flush()
            .await
            .map_err(|e| Error::connection(format!("Write to widget server failed: {}", e)))
    }
}

#[async_trait::async_trait]
impl ServerConnection for StdioConnection {
    async fn request(&self, request: McpRequest) -> Result<McpResponse> {
        let mut pipe = self.pipe.lock().await;
        // A late reply to an abandoned request is skipped by the id check
        tokio::time::timeout(self.timeout, Self::exchange(&mut pipe, &request))
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "{} did not answer {} within {:?}",
                    self.label, request.method, self.timeout
                ))
            })?
    }

    async fn notify(&self, notification: McpRequest) -> Result<()> {
        let mut pipe = self.pipe.lock().await;
        Self::write_line(&mut pipe, &notification).await
    }

    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn close(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            debug!(error = %e, "Widget server already exited");
        }
        Ok(())
    }
}

// === HTTP ===

/// Widget server behind its stateless HTTP endpoint
pub struct HttpConnection {
    url: String,
    http: reqwest::Client,
}

impl HttpConnection {
    pub fn new(url: &str, headers: &HashMap<String, String>) -> Result<Self> {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (name, value) in headers {
            header_map.insert(
                reqwest::header::HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| Error::configuration(format!("Invalid header name: {}", name)))?,
                value
                    .parse()
                    .map_err(|_| Error::configuration(format!("Invalid header value for {}", name)))?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(header_map)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            http,
        })
    }

    async fn post(&self, message: &McpRequest) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| Error::connection(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::connection(format!(
                "{} answered {}",
                self.url,
                status.as_u16()
            )));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ServerConnection for HttpConnection {
    async fn request(&self, request: McpRequest) -> Result<McpResponse> {
        let response = self.post(&request).await?;
        response
            .json::<McpResponse>()
            .await
            .map_err(|e| Error::protocol(format!("Invalid response from {}: {}", self.url, e)))
    }

    async fn notify(&self, notification: McpRequest) -> Result<()> {
        self.post(&notification).await.map(|_| ())
    }

    fn describe(&self) -> String {
        format!("http:{}", self.url)
    }
}

// === in-process ===

/// Widget server built inside this process (direct tool registration)
pub struct InProcessConnection {
    context: WidgetContext,
}

impl InProcessConnection {
    pub fn new(context: WidgetContext) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl ServerConnection for InProcessConnection {
    async fn request(&self, request: McpRequest) -> Result<McpResponse> {
        Ok(self.context.create().handle_request(request).await)
    }

    async fn notify(&self, notification: McpRequest) -> Result<()> {
        self.context.create().handle_request(notification).await;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("in-process:{}", self.context.name())
    }
}
