//! Error types for the embedded widget stack

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type shared by the widget crates
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration (credentials) is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token endpoint answered with a non-success status
    #[error("{0}")]
    Authentication(String),

    /// Token endpoint answered successfully but without a usable token
    #[error("{0}")]
    Format(String),

    /// A peer (tool server or upstream API) could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Renderer could not display the widget
    #[error("Render error: {0}")]
    Render(String),

    /// Peer violated the JSON-RPC / MCP contract
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used at process and tool boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "ConfigurationError")]
    Configuration,
    #[serde(rename = "AuthenticationError")]
    Authentication,
    #[serde(rename = "FormatError")]
    Format,
    #[serde(rename = "ConnectionError")]
    Connection,
    #[serde(rename = "RenderError")]
    Render,
    #[serde(rename = "ProtocolError")]
    Protocol,
    #[serde(rename = "InternalError")]
    Internal,
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Error::Render(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Authentication(_) => ErrorKind::Authentication,
            Error::Format(_) => ErrorKind::Format,
            Error::Connection(_) | Error::Io(_) => ErrorKind::Connection,
            Error::Render(_) => ErrorKind::Render,
            Error::Protocol(_) | Error::Serialization(_) => ErrorKind::Protocol,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error must terminate the process at startup
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Connection)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}
