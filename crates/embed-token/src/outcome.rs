//! Tagged exchange result
//!
//! The exchange either issues a token or fails with a classified message.
//! On the wire this is `{"ok":true,"token":..}` or
//! `{"ok":false,"kind":..,"message":..}`.

use crate::error::ExchangeError;
use crate::token::WidgetToken;
use embed_core::ErrorKind;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeFailure {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum TokenOutcome {
    Issued(WidgetToken),
    Failed(ExchangeFailure),
}

impl TokenOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, TokenOutcome::Issued(_))
    }

    pub fn token(&self) -> Option<&WidgetToken> {
        match self {
            TokenOutcome::Issued(token) => Some(token),
            TokenOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ExchangeFailure> {
        match self {
            TokenOutcome::Issued(_) => None,
            TokenOutcome::Failed(failure) => Some(failure),
        }
    }
}

impl From<Result<WidgetToken, ExchangeError>> for TokenOutcome {
    fn from(result: Result<WidgetToken, ExchangeError>) -> Self {
        match result {
            Ok(token) => TokenOutcome::Issued(token),
            Err(err) => TokenOutcome::Failed(ExchangeFailure {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Wire<'a> {
    Issued {
        ok: bool,
        token: &'a str,
    },
    Failed {
        ok: bool,
        kind: ErrorKind,
        message: &'a str,
    },
}

impl Serialize for TokenOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            TokenOutcome::Issued(token) => Wire::Issued {
                ok: true,
                token: token.as_str(),
            },
            TokenOutcome::Failed(failure) => Wire::Failed {
                ok: false,
                kind: failure.kind,
                message: &failure.message,
            },
        };
        wire.serialize(serializer)
    }
}
