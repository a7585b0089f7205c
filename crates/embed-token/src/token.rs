//! Opaque token newtypes and response decoding

use crate::error::{ExchangeError, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Response fields that may carry the token, in lookup order
pub const TOKEN_FIELDS: &[&str] = &["token", "access_token"];

/// Bearer token authenticating us to the widget-token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct ApplicationToken(String);

/// Origin-scoped token handed to the embedded widget
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetToken(String);

macro_rules! opaque_token {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        // Never print token material.
        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(<{} bytes>)"), self.0.len())
            }
        }
    };
}

opaque_token!(ApplicationToken);
opaque_token!(WidgetToken);

/// Pull the token out of a successful response body.
///
/// Accepts the first non-empty string among [`TOKEN_FIELDS`]. Anything else
/// is a format error listing the keys that were present.
pub(crate) fn extract_token(stage: Stage, body: &[u8]) -> Result<String, ExchangeError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| ExchangeError::Malformed {
        stage,
        detail: e.to_string(),
    })?;

    let Some(object) = value.as_object() else {
        return Err(ExchangeError::Format { stage, keys: Vec::new() });
    };

    TOKEN_FIELDS
        .iter()
        .filter_map(|field| object.get(*field).and_then(Value::as_str))
        .find(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            let mut keys: Vec<String> = object.keys().cloned().collect();
            keys.sort();
            ExchangeError::Format { stage, keys }
        })
}
