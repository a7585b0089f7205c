//! Environment Configuration Loader
//!
//! Two layers:
//!
//! 1. [`load_environment`] copies a dotenv-style file into the process
//!    environment without overriding variables that are already set.
//! 2. [`ExchangeSettings`] is assembled once at startup with the `config`
//!    crate from defaults, an optional `config/widget.toml`, and `AC_*`
//!    environment variables.
//!
//! ```no_run
//! use embed_core::config::{load_environment, ExchangeSettings};
//!
//! load_environment();
//! let settings = ExchangeSettings::load()?;
//! settings.require_credentials()?;
//! # Ok::<(), embed_core::Error>(())
//! ```

use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit env file
pub const ENV_FILE_VAR: &str = "EMBED_ENV_FILE";

/// Fallback env file paths (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &[".env"];

/// Optional settings file, relative to the working directory
pub const SETTINGS_FILE: &str = "config/widget";

/// Prefix of every settings environment variable
pub const ENV_PREFIX: &str = "AC";

pub const DEFAULT_API_BASE: &str = "https://api.airbyte.ai/api/v1";
pub const DEFAULT_WORKSPACE_NAME: &str = "customer-workspace";
/// Sandboxed documents without a real origin report `null`
pub const DEFAULT_ALLOWED_ORIGIN: &str = "null";
pub const DEFAULT_TOKEN_TIMEOUT_SECS: u64 = 10;

/// Load environment variables from the canonical env file.
///
/// Checks `EMBED_ENV_FILE` first, then `.env` in the working directory.
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var(ENV_FILE_VAR) {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);
    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for (key, value) in content.lines().filter_map(parse_env_line) {
                if std::env::var(&key).is_err() {
                    std::env::set_var(&key, &value);
                    loaded_count += 1;
                    debug!(key = %key, "Loaded variable");
                } else {
                    skipped_count += 1;
                    debug!(key = %key, "Skipped (already set)");
                }
            }

            info!(
                path = %path,
                loaded = loaded_count,
                skipped = skipped_count,
                "Loaded environment file"
            );
            Some(path.to_string())
        }
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to read environment file");
            None
        }
    }
}

/// Parse `KEY=VALUE`, `KEY="VALUE"`, `KEY='VALUE'` and `export KEY=VALUE`.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Settings for the two-hop token exchange.
///
/// Read once at process start and shared read-only afterwards.
#[derive(Clone, Deserialize)]
pub struct ExchangeSettings {
    #[serde(default)]
    pub airbyte_client_id: String,
    #[serde(default)]
    pub airbyte_client_secret: String,
    /// Sent as `workspace_name` when requesting a widget token
    pub external_user_id: String,
    pub allowed_origin: String,
    pub airbyte_api_base: String,
    pub token_timeout_secs: u64,
}

impl fmt::Debug for ExchangeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeSettings")
            .field("airbyte_client_id", &self.airbyte_client_id)
            .field("airbyte_client_secret", &"***")
            .field("external_user_id", &self.external_user_id)
            .field("allowed_origin", &self.allowed_origin)
            .field("airbyte_api_base", &self.airbyte_api_base)
            .field("token_timeout_secs", &self.token_timeout_secs)
            .finish()
    }
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            airbyte_client_id: String::new(),
            airbyte_client_secret: String::new(),
            external_user_id: DEFAULT_WORKSPACE_NAME.to_string(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            airbyte_api_base: DEFAULT_API_BASE.to_string(),
            token_timeout_secs: DEFAULT_TOKEN_TIMEOUT_SECS,
        }
    }
}

impl ExchangeSettings {
    /// Load from defaults, `config/widget.*` (optional) and the process environment
    pub fn load() -> Result<Self> {
        Self::build(Some(SETTINGS_FILE), None)
    }

    /// Load from defaults and an explicit variable map, ignoring the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::build(None, Some(vars))
    }

    fn build(file: Option<&str>, vars: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("external_user_id", DEFAULT_WORKSPACE_NAME)?
            .set_default("allowed_origin", DEFAULT_ALLOWED_ORIGIN)?
            .set_default("airbyte_api_base", DEFAULT_API_BASE)?
            .set_default("token_timeout_secs", DEFAULT_TOKEN_TIMEOUT_SECS)?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        // Values stay strings; numeric fields are converted on deserialize
        let env = Environment::with_prefix(ENV_PREFIX).prefix_separator("_");
        let env = match vars {
            Some(vars) => env.source(Some(vars.into_iter().collect())),
            None => env,
        };

        let settings: Self = builder.add_source(env).build()?.try_deserialize()?;
        debug!(settings = ?settings, "Exchange settings resolved");
        Ok(settings)
    }

    /// Fail with a configuration error naming every missing credential variable
    pub fn require_credentials(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.airbyte_client_id.trim().is_empty() {
            missing.push("AC_AIRBYTE_CLIENT_ID");
        }
        if self.airbyte_client_secret.trim().is_empty() {
            missing.push("AC_AIRBYTE_CLIENT_SECRET");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "Missing {} environment variable{}",
                missing.join(" or "),
                if missing.len() > 1 { "s" } else { "" }
            )))
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_secs)
    }

    /// Join an endpoint path onto the configured API base
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.airbyte_api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
