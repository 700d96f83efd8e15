//! Transport boundary.
//!
//! The client only needs a way to open a connection and two halves: one that
//! yields text frames and one that writes them. [`WebSocketConnector`] is the
//! production implementation; tests plug in their own [`Connector`].

mod error;
mod websocket;

use async_trait::async_trait;

pub use self::error::TransportError;
pub use self::websocket::{WebSocketConnector, WebSocketReader, WebSocketWriter};

/// WebSocket close code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Read half of a connection.
#[async_trait]
pub trait FrameReader: Send {
    /// Wait for the next text frame. `Ok(None)` means the peer closed.
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError>;
}

/// Write half of a connection.
#[async_trait]
pub trait FrameWriter: Send {
    /// Send one text frame.
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError>;

    /// Close the connection with `code`, usually [`NORMAL_CLOSURE`].
    ///
    /// Closing an already closed connection is not an error.
    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError>;
}

/// Opens connections.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Dial `address` and return the write and read halves.
    async fn connect(
        &self,
        address: &str,
    ) -> Result<(Box<dyn FrameWriter>, Box<dyn FrameReader>), TransportError>;
}

/// Split a frame into its non-empty lines.
///
/// Frames may carry several CRLF-terminated lines; a bare LF is accepted too.
pub fn split_lines(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
}
