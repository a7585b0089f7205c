//! embed-token: Widget Token Exchange
//!
//! Exchanges long-lived client credentials for a short-lived application
//! token, then presents that token for an origin-scoped widget token.
//!
//! ```text
//! credentials ──POST /account/applications/token──▶ application token
//! application token ──POST /embedded/widget-token──▶ widget token
//! ```
//!
//! Nothing is cached: every call to [`TokenExchangeClient::get_widget_token`]
//! performs both hops, strictly in order.

pub mod client;
pub mod error;
pub mod outcome;
pub mod token;

#[cfg(feature = "testing")]
pub mod testing;

pub use client::{TokenExchangeClient, WidgetTokenSource, APPLICATION_TOKEN_PATH, WIDGET_TOKEN_PATH};
pub use error::{ExchangeError, Stage};
pub use outcome::{ExchangeFailure, TokenOutcome};
pub use token::{ApplicationToken, WidgetToken};
