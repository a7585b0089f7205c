//! Server registry (`.mcp.json`)
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "airbyte-widget": { "command": "embed-mcp-server", "args": ["--stdio"], "env": {} },
//!     "remote":         { "url": "http://127.0.0.1:3000/mcp" },
//!     "local":          { "inProcess": true }
//!   }
//! }
//! ```
//!
//! String values may reference the environment as `${VAR}` or `${VAR:-default}`.

use embed_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_REGISTRY_FILE: &str = ".mcp.json";

/// How to reach one widget server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEntry {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    Http {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    InProcess {
        #[serde(rename = "inProcess")]
        in_process: bool,
    },
}

impl ServerEntry {
    pub fn transport_name(&self) -> &'static str {
        match self {
            ServerEntry::Stdio { .. } => "stdio",
            ServerEntry::Http { .. } => "http",
            ServerEntry::InProcess { .. } => "in-process",
        }
    }

    fn expand(self, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let map = |values: HashMap<String, String>| -> HashMap<String, String> {
            values
                .into_iter()
                .map(|(k, v)| (k, expand_vars(&v, lookup)))
                .collect()
        };
        match self {
            ServerEntry::Stdio { command, args, env } => ServerEntry::Stdio {
                command: expand_vars(&command, lookup),
                args: args.iter().map(|a| expand_vars(a, lookup)).collect(),
                env: map(env),
            },
            ServerEntry::Http { url, headers } => ServerEntry::Http {
                url: expand_vars(&url, lookup),
                headers: map(headers),
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerRegistry {
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, ServerEntry>,
}

impl ServerRegistry {
    /// Load from a file, expanding `${VAR}` references against the process environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let registry = Self::from_json_with(&content, &|name: &str| std::env::var(name).ok())?;
        info!(path = %path.display(), servers = registry.servers.len(), "Loaded server registry");
        Ok(registry)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Self::from_json_with(content, &|name: &str| std::env::var(name).ok())
    }

    pub fn from_json_with(content: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let raw: ServerRegistry = serde_json::from_str(content)
            .map_err(|e| Error::configuration(format!("Invalid server registry: {}", e)))?;
        let servers = raw
            .servers
            .into_iter()
            .map(|(name, entry)| (name, entry.expand(lookup)))
            .collect();
        Ok(Self { servers })
    }

    /// In-process registry used when no file is present
    pub fn in_process(name: impl Into<String>) -> Self {
        let mut servers = BTreeMap::new();
        servers.insert(name.into(), ServerEntry::InProcess { in_process: true });
        Self { servers }
    }

    /// Pick a server by name, or the only one when no name is given
    pub fn select(&self, name: Option<&str>) -> Result<(&str, &ServerEntry)> {
        match name {
            Some(name) => self
                .servers
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| Error::configuration(format!("Unknown server: {}", name))),
            None => {
                let mut iter = self.servers.iter();
                match (iter.next(), iter.next()) {
                    (Some((k, v)), None) => {
                        debug!(server = %k, "Selected only registered server");
                        Ok((k.as_str(), v))
                    }
                    (None, _) => Err(Error::configuration("No servers registered")),
                    (Some(_), Some(_)) => Err(Error::configuration(format!(
                        "Several servers registered ({}); pick one with --server",
                        self.servers.keys().cloned().collect::<Vec<_>>().join(", ")
                    ))),
                }
            }
        }
    }
}

/// Replace `${VAR}` and `${VAR:-default}`. Unknown variables without a default become empty.
pub fn expand_vars(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let expr = &after[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr, None),
        };
        match lookup(name).filter(|v| !v.is_empty()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(default.unwrap_or("")),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
