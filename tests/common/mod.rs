//! Channel-backed transport for driving a session from tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slirc_tmi::transport::{Connector, FrameReader, FrameWriter, TransportError};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(30);

/// Hands out in-memory connections and tells the test about each one.
pub struct MockConnector {
    accepted: mpsc::UnboundedSender<MockConn>,
    failures_left: Arc<AtomicUsize>,
    hangups_left: Arc<AtomicUsize>,
    dials: Arc<AtomicUsize>,
}

/// The test's side of the mock transport.
pub struct MockServer {
    accepted: mpsc::UnboundedReceiver<MockConn>,
    failures_left: Arc<AtomicUsize>,
    hangups_left: Arc<AtomicUsize>,
    dials: Arc<AtomicUsize>,
}

pub fn mock() -> (MockConnector, MockServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let failures_left = Arc::new(AtomicUsize::new(0));
    let hangups_left = Arc::new(AtomicUsize::new(0));
    let dials = Arc::new(AtomicUsize::new(0));
    (
        MockConnector {
            accepted: tx,
            failures_left: failures_left.clone(),
            hangups_left: hangups_left.clone(),
            dials: dials.clone(),
        },
        MockServer {
            accepted: rx,
            failures_left,
            hangups_left,
            dials,
        },
    )
}

impl MockServer {
    /// Make the next `n` dials fail.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` connections report end of stream on their first
    /// read, before the client has finished logging in.
    pub fn hang_up_next(&self, n: usize) {
        self.hangups_left.store(n, Ordering::SeqCst);
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Wait for the client to open a connection.
    pub async fn accept(&mut self) -> MockConn {
        tokio::time::timeout(WAIT, self.accepted.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    /// Assert that no connection is opened within `within`.
    pub async fn expect_no_connection(&mut self, within: Duration) {
        if let Ok(Some(_)) = tokio::time::timeout(within, self.accepted.recv()).await {
            panic!("unexpected connection");
        }
    }
}

/// One accepted connection. Dropping it closes the client's read side.
pub struct MockConn {
    written: mpsc::UnboundedReceiver<String>,
    frames: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
    reader_dropped: Arc<AtomicBool>,
}

impl MockConn {
    /// Next line written by the client, without its CRLF.
    pub async fn line(&mut self) -> String {
        let frame = tokio::time::timeout(WAIT, self.written.recv())
            .await
            .expect("timed out waiting for a line")
            .expect("client side closed");
        assert!(frame.ends_with("\r\n"), "frame without CRLF: {:?}", frame);
        frame.trim_end_matches("\r\n").to_string()
    }

    /// The next `n` lines.
    pub async fn lines(&mut self, n: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(n);
        for _ in 0..n {
            lines.push(self.line().await);
        }
        lines
    }

    /// Assert that nothing is written within `within`.
    pub async fn expect_silence(&mut self, within: Duration) {
        if let Ok(Some(frame)) = tokio::time::timeout(within, self.written.recv()).await {
            panic!("unexpected line: {:?}", frame);
        }
    }

    /// Send a frame to the client.
    pub fn send(&self, frame: &str) {
        let _ = self.frames.send(frame.to_string());
    }

    /// Whether the client closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the client to drop its read half of this connection.
    pub async fn reader_released(&self) {
        let released = async {
            while !self.reader_dropped.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(WAIT, released)
            .await
            .expect("read half of a replaced connection still alive");
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        address: &str,
    ) -> Result<(Box<dyn FrameWriter>, Box<dyn FrameReader>), TransportError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Connect {
                address: address.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let hang_up = self
            .hangups_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let (written_tx, written) = mpsc::unbounded_channel();
        let (frames, frames_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let reader_dropped = Arc::new(AtomicBool::new(false));

        let conn = MockConn {
            written,
            frames,
            closed: closed.clone(),
            reader_dropped: reader_dropped.clone(),
        };
        if self.accepted.send(conn).is_err() {
            return Err(TransportError::NotConnected);
        }

        Ok((
            Box::new(MockWriter {
                tx: written_tx,
                closed,
            }),
            Box::new(MockReader {
                rx: frames_rx,
                hang_up,
                dropped: reader_dropped,
            }),
        ))
    }
}

struct MockWriter {
    tx: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl FrameWriter for MockWriter {
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self, _code: u16, _reason: &str) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MockReader {
    rx: mpsc::UnboundedReceiver<String>,
    hang_up: bool,
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl FrameReader for MockReader {
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError> {
        if self.hang_up {
            return Ok(None);
        }
        Ok(self.rx.recv().await)
    }
}

impl Drop for MockReader {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}
