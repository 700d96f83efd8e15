//! Transport error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised by a [`Connector`](super::Connector) or its halves.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("failed to connect to {address}: {reason}")]
    Connect {
        /// Address that was dialed.
        address: String,
        /// Why the dial failed.
        reason: String,
    },

    /// WebSocket protocol or I/O failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A write was attempted while no connection is installed.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Connect {
            address: "wss://irc-ws.chat.twitch.tv".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to connect to wss://irc-ws.chat.twitch.tv: refused"
        );
        assert_eq!(TransportError::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let err: TransportError = io_err.into();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
