//! Core types and utilities for the embedded widget stack
//!
//! # Modules
//!
//! - `config`: Environment file loading and token exchange settings
//! - `error`: Error taxonomy and Result alias
//! - `logging`: Tracing subscriber bootstrap (always on stderr)
//! - `shutdown`: SIGINT/SIGTERM future for graceful shutdown

pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;

// Re-exports
pub use config::{load_environment, ExchangeSettings};
pub use error::{Error, ErrorKind, Result};
pub use shutdown::{shutdown_signal, wait_for_stop, StopSignal};
