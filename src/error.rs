//! Error types for the chat client.
//!
//! This module defines the crate-level [`ClientError`] and the structural
//! failures produced by the wire parser. Transport failures live in
//! [`crate::transport::TransportError`].

use std::time::Duration;

use thiserror::Error;

#[cfg(feature = "tokio")]
use crate::transport::TransportError;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Top-level client errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Dial, read or write failure on the underlying transport.
    #[cfg(feature = "tokio")]
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Failed to parse an inbound line.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },

    /// A lane hit its quota and is stalling before the next write.
    ///
    /// Never returned to callers; the lane blocks instead of failing.
    #[error("{lane} lane reached its limit of {limit} messages per {window:?}")]
    QuotaExceeded {
        /// Name of the stalled lane.
        lane: &'static str,
        /// Quota that was reached.
        limit: usize,
        /// Window the lane sleeps for.
        window: Duration,
    },

    /// The server did not answer a keepalive probe in time.
    #[error("no PONG received within {0:?}")]
    ProtocolTimeout(Duration),

    /// The embedder asked for the connection to be replaced.
    #[error("reconnect requested")]
    ReconnectRequested,

    /// `run` was called on a session that is already running.
    #[error("session is already running")]
    AlreadyRunning,

    /// The session was closed.
    #[error("session closed")]
    Closed,
}

impl ClientError {
    /// Returns `true` if this error should send the session back to dialing.
    pub fn triggers_reconnect(&self) -> bool {
        match self {
            #[cfg(feature = "tokio")]
            ClientError::Transport(_) => true,
            ClientError::ProtocolTimeout(_) | ClientError::ReconnectRequested => true,
            _ => false,
        }
    }
}

/// Structural failures of the wire parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// The line carried tags but nothing after them.
    #[error("partial message")]
    PartialMessage,

    /// No command token followed the tags and source.
    #[error("no command")]
    NoCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MessageParseError::NoCommand.to_string(), "no command");
        assert_eq!(
            MessageParseError::PartialMessage.to_string(),
            "partial message"
        );

        let err = ClientError::QuotaExceeded {
            lane: "chat",
            limit: 20,
            window: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "chat lane reached its limit of 20 messages per 30s"
        );
    }

    #[test]
    fn test_error_source_chaining() {
        let err = ClientError::InvalidMessage {
            string: "@k=v".to_string(),
            cause: MessageParseError::PartialMessage,
        };

        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert_eq!(source.unwrap().to_string(), "partial message");
    }

    #[test]
    fn test_reconnect_classification() {
        assert!(ClientError::ProtocolTimeout(Duration::from_secs(5)).triggers_reconnect());
        assert!(ClientError::ReconnectRequested.triggers_reconnect());
        #[cfg(feature = "tokio")]
        assert!(ClientError::Transport(TransportError::NotConnected).triggers_reconnect());
        assert!(!ClientError::Closed.triggers_reconnect());
        assert!(!ClientError::QuotaExceeded {
            lane: "join",
            limit: 20,
            window: Duration::from_secs(10),
        }
        .triggers_reconnect());
    }
}
