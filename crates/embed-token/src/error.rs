//! Token exchange failures

use embed_core::ErrorKind;
use std::fmt;
use thiserror::Error;

/// Which hop of the exchange failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ApplicationToken,
    WidgetToken,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ApplicationToken => write!(f, "application token"),
            Stage::WidgetToken => write!(f, "widget token"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("{0}")]
    MissingCredentials(String),

    #[error("{}", rejected_message(*stage, *status))]
    Rejected { stage: Stage, status: u16 },

    #[error("Unexpected {stage} response format: {keys:?}")]
    Format { stage: Stage, keys: Vec<String> },

    #[error("Malformed {stage} response: {detail}")]
    Malformed { stage: Stage, detail: String },

    #[error("Connection timeout while fetching {stage}")]
    Timeout { stage: Stage },

    #[error("Connection error: {detail}")]
    Transport { stage: Stage, detail: String },
}

fn rejected_message(stage: Stage, status: u16) -> String {
    match stage {
        Stage::ApplicationToken => format!("Authentication failed: {}", status),
        Stage::WidgetToken => format!("Failed to fetch widget token: {}", status),
    }
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::MissingCredentials(_) => ErrorKind::Configuration,
            ExchangeError::Rejected { .. } => ErrorKind::Authentication,
            ExchangeError::Format { .. } | ExchangeError::Malformed { .. } => ErrorKind::Format,
            ExchangeError::Timeout { .. } | ExchangeError::Transport { .. } => {
                ErrorKind::Connection
            }
        }
    }

    pub(crate) fn from_reqwest(stage: Stage, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout { stage }
        } else {
            ExchangeError::Transport {
                stage,
                detail: err.to_string(),
            }
        }
    }
}

impl From<ExchangeError> for embed_core::Error {
    fn from(err: ExchangeError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Configuration => embed_core::Error::Configuration(message),
            ErrorKind::Authentication => embed_core::Error::Authentication(message),
            ErrorKind::Format => embed_core::Error::Format(message),
            _ => embed_core::Error::Connection(message),
        }
    }
}
