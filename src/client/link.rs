//! The shared connection slot.
//!
//! All physical writes go through [`Link::send`], which holds the write lock
//! for the duration of one frame. The link also publishes how far the
//! current connection has progressed ([`Stage`]) so lanes know when they may
//! write, and reports failures to the supervisor tagged with the connection
//! generation they belong to.

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::transport::{FrameWriter, TransportError};

/// Progress of the current connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    /// No usable connection.
    Down,
    /// Transport open, login not finished.
    Open,
    /// Logged in; every lane may write.
    Ready,
}

pub(crate) struct Link {
    writer: AsyncMutex<Option<Box<dyn FrameWriter>>>,
    generation: Mutex<u64>,
    stage: watch::Sender<Stage>,
    failures: mpsc::UnboundedSender<u64>,
    debug: bool,
}

impl Link {
    /// Create a link and the receiver on which failed generations arrive.
    pub(crate) fn new(debug: bool) -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (failures, rx) = mpsc::unbounded_channel();
        let (stage, _) = watch::channel(Stage::Down);
        let link = Self {
            writer: AsyncMutex::new(None),
            generation: Mutex::new(0),
            stage,
            failures,
            debug,
        };
        (link, rx)
    }

    /// Install a fresh writer and return its generation.
    pub(crate) async fn install(&self, writer: Box<dyn FrameWriter>) -> u64 {
        let mut slot = self.writer.lock().await;
        *slot = Some(writer);
        let mut generation = self.generation.lock();
        *generation += 1;
        self.stage.send_replace(Stage::Open);
        *generation
    }

    /// Remove the writer, leaving the link down.
    pub(crate) async fn take(&self) -> Option<Box<dyn FrameWriter>> {
        let mut slot = self.writer.lock().await;
        self.stage.send_replace(Stage::Down);
        slot.take()
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    pub(crate) fn stage(&self) -> Stage {
        *self.stage.borrow()
    }

    /// Advance the stage of connection `generation`. Returns `false`, and
    /// changes nothing, if that connection is stale or already down.
    pub(crate) fn promote(&self, generation: u64, stage: Stage) -> bool {
        let current = self.generation.lock();
        if *current != generation || self.stage() == Stage::Down {
            return false;
        }
        self.stage.send_replace(stage);
        true
    }

    /// Resolve once connection `generation` is down or replaced.
    pub(crate) async fn lost(&self, generation: u64) {
        let mut rx = self.stage.subscribe();
        loop {
            let stage = *rx.borrow_and_update();
            if stage == Stage::Down || self.generation() != generation {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Wait until the link reaches at least `stage`. Returns `false` if
    /// cancelled first.
    pub(crate) async fn wait_for(&self, stage: Stage, cancel: &CancellationToken) -> bool {
        let mut rx = self.stage.subscribe();
        loop {
            if *rx.borrow_and_update() >= stage {
                return true;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    /// Write one line, appending the CRLF terminator.
    ///
    /// A write failure marks the connection as failed; the line is not
    /// retried.
    pub(crate) async fn send(&self, line: &str) -> Result<(), TransportError> {
        self.write(None, line).await
    }

    /// Like [`Link::send`], but only on connection `generation`. Lines meant
    /// for a replaced connection fail with `NotConnected`.
    pub(crate) async fn send_on(&self, generation: u64, line: &str) -> Result<(), TransportError> {
        self.write(Some(generation), line).await
    }

    async fn write(&self, expected: Option<u64>, line: &str) -> Result<(), TransportError> {
        let mut slot = self.writer.lock().await;
        let writer = slot.as_mut().ok_or(TransportError::NotConnected)?;
        let generation = self.generation();
        if expected.is_some_and(|expected| expected != generation) {
            return Err(TransportError::NotConnected);
        }

        if self.debug {
            debug!(%line, "> ");
        }

        match writer.write_frame(format!("{}\r\n", line)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                drop(slot);
                self.report(generation, &e);
                Err(e)
            }
        }
    }

    /// Mark connection `generation` as failed and wake the supervisor.
    pub(crate) fn report(&self, generation: u64, cause: &dyn std::error::Error) {
        let current = self.generation.lock();
        if *current != generation || self.stage() == Stage::Down {
            return;
        }
        warn!(generation, error = %cause, "connection failed");
        self.stage.send_replace(Stage::Down);
        let _ = self.failures.send(generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Recorder(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl FrameWriter for Recorder {
        async fn write_frame(&mut self, frame: String) -> Result<(), TransportError> {
            self.0.lock().push(frame);
            Ok(())
        }

        async fn close(&mut self, _code: u16, _reason: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl FrameWriter for Broken {
        async fn write_frame(&mut self, _frame: String) -> Result<(), TransportError> {
            Err(TransportError::Closed)
        }

        async fn close(&mut self, _code: u16, _reason: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_send_appends_crlf() {
        let (link, _failures) = Link::new(false);
        let written = Arc::new(Mutex::new(Vec::new()));
        link.install(Box::new(Recorder(written.clone()))).await;

        link.send("PING :tmi.twitch.tv").await.unwrap();
        assert_eq!(*written.lock(), vec!["PING :tmi.twitch.tv\r\n".to_string()]);
    }

    #[tokio::test]
    async fn test_send_without_writer() {
        let (link, _failures) = Link::new(false);
        assert!(matches!(
            link.send("NICK x").await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_failure_reported_once_per_generation() {
        let (link, mut failures) = Link::new(false);
        let generation = link.install(Box::new(Broken)).await;
        assert_eq!(link.stage(), Stage::Open);

        assert!(link.send("JOIN #a").await.is_err());
        assert!(link.send("JOIN #b").await.is_err());
        assert_eq!(link.stage(), Stage::Down);

        assert_eq!(failures.recv().await, Some(generation));
        assert!(failures.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_promote_ignored() {
        let (link, _failures) = Link::new(false);
        let first = link.install(Box::new(Broken)).await;
        let second = link.install(Box::new(Broken)).await;

        assert!(!link.promote(first, Stage::Ready));
        assert_eq!(link.stage(), Stage::Open);
        assert!(link.promote(second, Stage::Ready));
        assert_eq!(link.stage(), Stage::Ready);
    }

    #[tokio::test]
    async fn test_promote_after_failure_refused() {
        let (link, _failures) = Link::new(false);
        let generation = link.install(Box::new(Broken)).await;
        link.report(generation, &TransportError::Closed);

        assert!(!link.promote(generation, Stage::Ready));
        assert_eq!(link.stage(), Stage::Down);
    }

    #[tokio::test]
    async fn test_send_on_replaced_connection() {
        let (link, _failures) = Link::new(false);
        let written = Arc::new(Mutex::new(Vec::new()));
        let first = link.install(Box::new(Recorder(written.clone()))).await;
        let second = link.install(Box::new(Recorder(written.clone()))).await;

        assert!(matches!(
            link.send_on(first, "JOIN #old").await,
            Err(TransportError::NotConnected)
        ));
        link.send_on(second, "JOIN #new").await.unwrap();
        assert_eq!(*written.lock(), vec!["JOIN #new\r\n".to_string()]);
    }

    #[tokio::test]
    async fn test_lost_resolves_on_failure() {
        let (link, _failures) = Link::new(false);
        let link = Arc::new(link);
        let generation = link.install(Box::new(Broken)).await;

        let waiter = tokio::spawn({
            let link = link.clone();
            async move { link.lost(generation).await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        link.report(generation, &TransportError::Closed);
        tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();

        // a replaced connection counts as lost too
        let next = link.install(Box::new(Broken)).await;
        link.install(Box::new(Broken)).await;
        link.lost(next).await;
    }

    #[tokio::test]
    async fn test_wait_for_cancelled() {
        let (link, _failures) = Link::new(false);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!link.wait_for(Stage::Ready, &cancel).await);
    }
}
