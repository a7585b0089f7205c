//! Token Exchange Client
//!
//! Two sequential POSTs against the embedded API. No caching, no retry,
//! no refresh.

use crate::error::{ExchangeError, Stage};
use crate::outcome::TokenOutcome;
use crate::token::{extract_token, ApplicationToken, WidgetToken};
use embed_core::ExchangeSettings;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const APPLICATION_TOKEN_PATH: &str = "/account/applications/token";
pub const WIDGET_TOKEN_PATH: &str = "/embedded/widget-token";

/// Anything that can mint a fresh widget token per call
#[async_trait::async_trait]
pub trait WidgetTokenSource: Send + Sync {
    /// Run a full exchange. Never fails: errors are folded into the outcome.
    async fn issue(&self) -> TokenOutcome;
}

/// HTTP client for the application-token / widget-token exchange
#[derive(Clone)]
pub struct TokenExchangeClient {
    settings: Arc<ExchangeSettings>,
    http: reqwest::Client,
}

impl TokenExchangeClient {
    pub fn new(settings: ExchangeSettings) -> embed_core::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| embed_core::Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            settings: Arc::new(settings),
            http,
        })
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    /// Exchange client credentials for an application token.
    ///
    /// Fails before touching the network when either credential is empty.
    pub async fn fetch_application_token(&self) -> Result<ApplicationToken, ExchangeError> {
        self.settings
            .require_credentials()
            .map_err(|e| ExchangeError::MissingCredentials(missing_message(e)))?;

        let body = json!({
            "client_id": self.settings.airbyte_client_id,
            "client_secret": self.settings.airbyte_client_secret,
        });

        let token = self
            .post_for_token(Stage::ApplicationToken, APPLICATION_TOKEN_PATH, None, body)
            .await?;
        Ok(ApplicationToken::new(token))
    }

    /// Present an application token for a widget token scoped to the
    /// configured workspace and allowed origin.
    pub async fn fetch_widget_token(
        &self,
        application_token: &ApplicationToken,
    ) -> Result<WidgetToken, ExchangeError> {
        let body = json!({
            "workspace_name": self.settings.external_user_id,
            "allowed_origin": self.settings.allowed_origin,
        });

        let token = self
            .post_for_token(
                Stage::WidgetToken,
                WIDGET_TOKEN_PATH,
                Some(application_token.as_str()),
                body,
            )
            .await?;
        Ok(WidgetToken::new(token))
    }

    /// Both hops in order; a failure in the first aborts before the second.
    pub async fn get_widget_token(&self) -> Result<WidgetToken, ExchangeError> {
        let application_token = self.fetch_application_token().await?;
        let widget_token = self.fetch_widget_token(&application_token).await?;
        info!(
            workspace = %self.settings.external_user_id,
            origin = %self.settings.allowed_origin,
            token_len = widget_token.as_str().len(),
            "Widget token issued"
        );
        Ok(widget_token)
    }

    async fn post_for_token(
        &self,
        stage: Stage,
        path: &str,
        bearer: Option<&str>,
        body: Value,
    ) -> Result<String, ExchangeError> {
        let url = self.settings.endpoint(path);
        debug!(stage = %stage, url = %url, "Requesting token");

        let mut request = self.http.post(&url).json(&body);
        if let Some(bearer) = bearer {
            request = request.bearer_auth(bearer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::from_reqwest(stage, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(stage = %stage, status = status.as_u16(), "Token endpoint rejected request");
            return Err(ExchangeError::Rejected {
                stage,
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExchangeError::from_reqwest(stage, e))?;
        extract_token(stage, &bytes)
    }
}

fn missing_message(err: embed_core::Error) -> String {
    match err {
        embed_core::Error::Configuration(message) => message,
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl WidgetTokenSource for TokenExchangeClient {
    async fn issue(&self) -> TokenOutcome {
        let outcome = TokenOutcome::from(self.get_widget_token().await);
        if let Some(failure) = outcome.failure() {
            warn!(kind = ?failure.kind, message = %failure.message, "Widget token exchange failed");
        }
        outcome
    }
}
