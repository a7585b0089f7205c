//! Host state machine
//!
//! ```text
//! idle → connecting → connected ⇄ awaiting_tool_result → rendering → connected
//!            │                          │
//!            ▼                          ▼
//!       error (fatal)          error (recoverable) → awaiting_tool_result
//! ```

use embed_core::{Error, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HostState {
    Idle,
    Connecting,
    Connected,
    AwaitingToolResult,
    Rendering,
    Error { message: String, recoverable: bool },
}

impl HostState {
    pub fn name(&self) -> &'static str {
        match self {
            HostState::Idle => "idle",
            HostState::Connecting => "connecting",
            HostState::Connected => "connected",
            HostState::AwaitingToolResult => "awaiting_tool_result",
            HostState::Rendering => "rendering",
            HostState::Error { .. } => "error",
        }
    }

    /// Whether a widget request may start from here
    pub fn accepts_requests(&self) -> bool {
        matches!(
            self,
            HostState::Connected
                | HostState::Error {
                    recoverable: true,
                    ..
                }
        )
    }

    /// Connected with a working server; other requests may be in flight
    pub fn is_live(&self) -> bool {
        self.accepts_requests()
            || matches!(self, HostState::AwaitingToolResult | HostState::Rendering)
    }

    pub fn can_transition_to(&self, next: &HostState) -> bool {
        match (self, next) {
            (HostState::Idle, HostState::Connecting) => true,
            (HostState::Connecting, HostState::Connected) => true,
            (HostState::Connecting, HostState::Error { recoverable, .. }) => !recoverable,
            (HostState::Connected, HostState::AwaitingToolResult) => true,
            (HostState::AwaitingToolResult, HostState::Rendering) => true,
            (HostState::AwaitingToolResult, HostState::Error { recoverable, .. }) => *recoverable,
            (HostState::Rendering, HostState::Connected) => true,
            (HostState::Error { recoverable: true, .. }, HostState::AwaitingToolResult) => true,
            (HostState::Error { recoverable: true, .. }, HostState::Connected) => true,
            (_, HostState::Idle) => true,
            _ => false,
        }
    }

    /// Move to `next`, rejecting transitions the machine does not have
    pub fn transition(&mut self, next: HostState) -> Result<()> {
        if !self.can_transition_to(&next) {
            return Err(Error::internal(format!(
                "Illegal host transition: {} -> {}",
                self.name(),
                next.name()
            )));
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostState::Error { message, .. } => write!(f, "error ({})", message),
            other => f.write_str(other.name()),
        }
    }
}
