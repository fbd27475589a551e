//! Gateway error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the Murmur control gateway.
///
/// Transport failures and remote rejections are kept apart so callers can
/// decide on retry policy; the gateway itself never retries.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway is missing required configuration.
    #[error("gateway configuration error: {0}")]
    Config(String),

    /// No session has been established yet.
    #[error("not connected to the Murmur control endpoint")]
    NotConnected,

    /// The control endpoint rejected the session (bad secret, no such
    /// server, refused handshake).
    #[error("Murmur control connection failed: {0}")]
    ConnectionFailed(String),

    /// A call exceeded the hard per-call timeout. Distinct from
    /// connection-refused so callers can tell a slow server from a dead one.
    #[error("Murmur control call timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint was unreachable or the connection broke mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote server processed the call and reported a failure.
    #[error("remote error: {0}")]
    Remote(String),

    /// A registration already exists under this exact name.
    #[error("user '{name}' already exists with id {id}")]
    DuplicateUser { name: String, id: i32 },

    /// The requested remote object does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Rejected before any call was made.
    #[error("invalid username: {0}")]
    InvalidUsername(String),
}

impl GatewayError {
    /// Whether this error indicates the session itself is unusable.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::ConnectionFailed(_) | Self::Transport(_)
        )
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
