//! Tracing bootstrap
//!
//! Logs always go to stderr: the stdio transport owns stdout.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `default_directives`.
pub fn init_tracing(default_directives: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))?;

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(filter)
        .try_init()?;
    Ok(())
}

/// Map a `--log-level` flag onto filter directives for our crates.
pub fn directives_for(level: &str) -> String {
    let level = match level {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        _ => "info",
    };
    format!("warn,embed_core={level},embed_token={level},embed_mcp={level},embed_renderer={level},embed_host={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        assert!(directives_for("verbose").contains("embed_mcp=info"));
        assert!(directives_for("debug").contains("embed_host=debug"));
    }
}
