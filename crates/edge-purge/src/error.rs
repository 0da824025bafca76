//! Error types for cache invalidation.

use std::io;
use std::time::Duration;

use edge_cache::PatternError;
use edge_core::ConfigError;
use thiserror::Error;

/// Failure talking to a single cache server.
///
/// Never escapes a dispatch: each one is logged and recorded in the
/// dispatch report for the server it concerns.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server unreachable.
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Connection dropped mid-exchange.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No answer within the per-server timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Non-2xx status.
    #[error("cache server answered {0}")]
    Status(u16),

    /// Not an HTTP status line.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors raised by invalidation operations.
#[derive(Debug, Error)]
pub enum PurgeError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for invalidation operations.
pub type PurgeResult<T> = Result<T, PurgeError>;
