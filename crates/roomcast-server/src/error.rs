//! Server error types.
//!
//! Two layers: [`DriverError`] for failures inside event processing that
//! signal a transport/registry desynchronization (never shown to clients),
//! and [`ServerError`] for runtime failures (configuration, transport).
//! Client-fault protocol errors never reach these types; the driver answers
//! them to the offending connection directly.

use std::io;

use roomcast_core::RegistryError;
use thiserror::Error;

/// Errors from [`crate::ServerDriver`] event processing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The transport and the registry disagree about which connections are
    /// alive. Indicates a bug in the edge layer, not a client mistake.
    #[error("registry desync: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors from the server runtime.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, etc.). Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error (bind failure, I/O error, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// Driver error surfaced out of event processing.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
