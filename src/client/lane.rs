//! Rate-limited outbound lanes.
//!
//! Each category of outbound message has its own FIFO queue and worker.
//! A worker counts every message against its lane's window(s) and, when a
//! window is full, sleeps for the window duration instead of dropping the
//! message. Workers then hand the line to the shared [`Link`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::BotTier;
use super::link::{Link, Stage};
use crate::error::ClientError;
use crate::ratelimit::{Quota, Window};
use crate::transport::TransportError;

const TEN_SECONDS: Duration = Duration::from_secs(10);
const THIRTY_SECONDS: Duration = Duration::from_secs(30);

const AUTH_DEFAULT: [Quota; 1] = [Quota::new(20, TEN_SECONDS)];
const AUTH_VERIFIED: [Quota; 1] = [Quota::new(200, TEN_SECONDS)];
const CHAT: [Quota; 1] = [Quota::new(20, THIRTY_SECONDS)];
const PRIVILEGED: [Quota; 1] = [Quota::new(100, THIRTY_SECONDS)];
// minute window first: both must have room before a whisper goes out
const WHISPER_DEFAULT: [Quota; 2] = [Quota::per_minute(100), Quota::per_second(3)];
const WHISPER_KNOWN: [Quota; 2] = [Quota::per_minute(200), Quota::per_second(10)];
const WHISPER_VERIFIED: [Quota; 2] = [Quota::per_minute(1200), Quota::per_second(20)];

/// Category of outbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Login handshake lines.
    Authenticate,
    /// `JOIN` and `PART`.
    Join,
    /// Chat messages from a regular user.
    Chat,
    /// Chat messages in rooms where the account is a moderator or broadcaster.
    Privileged,
    Whisper,
}

impl LaneKind {
    pub const ALL: [LaneKind; 5] = [
        LaneKind::Authenticate,
        LaneKind::Join,
        LaneKind::Chat,
        LaneKind::Privileged,
        LaneKind::Whisper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LaneKind::Authenticate => "authenticate",
            LaneKind::Join => "join",
            LaneKind::Chat => "chat",
            LaneKind::Privileged => "privileged",
            LaneKind::Whisper => "whisper",
        }
    }

    /// Windows enforced by this lane for an account of `tier`.
    pub fn quotas(self, tier: BotTier) -> &'static [Quota] {
        match (self, tier) {
            (LaneKind::Authenticate | LaneKind::Join, BotTier::VerifiedBot) => &AUTH_VERIFIED,
            (LaneKind::Authenticate | LaneKind::Join, _) => &AUTH_DEFAULT,
            (LaneKind::Chat, _) => &CHAT,
            (LaneKind::Privileged, _) => &PRIVILEGED,
            (LaneKind::Whisper, BotTier::VerifiedBot) => &WHISPER_VERIFIED,
            (LaneKind::Whisper, BotTier::KnownBot) => &WHISPER_KNOWN,
            (LaneKind::Whisper, _) => &WHISPER_DEFAULT,
        }
    }

    /// Link stage the lane waits for before writing.
    fn required_stage(self) -> Stage {
        match self {
            LaneKind::Authenticate => Stage::Open,
            _ => Stage::Ready,
        }
    }
}

impl std::fmt::Display for LaneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one write, reported to callers that asked for it.
pub(crate) type Ack = oneshot::Receiver<Result<(), TransportError>>;

pub(crate) struct Outbound {
    line: String,
    /// Connection the line belongs to; `None` follows the session across
    /// reconnects.
    generation: Option<u64>,
    ack: Option<oneshot::Sender<Result<(), TransportError>>>,
}

/// Submission side of a lane. Closing it lets the worker drain and stop.
pub(crate) struct LaneSender {
    kind: LaneKind,
    tx: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
}

impl LaneSender {
    /// Queue `line`. Lines submitted after close are dropped.
    pub(crate) fn submit(&self, line: String) {
        self.push(Outbound {
            line,
            generation: None,
            ack: None,
        });
    }

    /// Queue `line` for connection `generation` only. It is dropped if that
    /// connection is gone by the time the line reaches the front.
    pub(crate) fn submit_for(&self, generation: u64, line: String) {
        self.push(Outbound {
            line,
            generation: Some(generation),
            ack: None,
        });
    }

    /// Queue `line` for connection `generation` and get notified once it
    /// has been written or dropped.
    pub(crate) fn submit_with_ack(&self, generation: u64, line: String) -> Ack {
        let (tx, rx) = oneshot::channel();
        self.push(Outbound {
            line,
            generation: Some(generation),
            ack: Some(tx),
        });
        rx
    }

    fn push(&self, item: Outbound) {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) if tx.send(item).is_ok() => {}
            _ => debug!(lane = %self.kind, "lane closed, dropping message"),
        }
    }

    pub(crate) fn close(&self) {
        self.tx.lock().take();
    }
}

/// Worker side of a lane.
pub(crate) struct Lane {
    kind: LaneKind,
    windows: Vec<Window>,
    queue: mpsc::UnboundedReceiver<Outbound>,
}

impl Lane {
    pub(crate) fn new(kind: LaneKind, tier: BotTier) -> (LaneSender, Lane) {
        let (tx, queue) = mpsc::unbounded_channel();
        let windows = kind.quotas(tier).iter().copied().map(Window::new).collect();
        (
            LaneSender {
                kind,
                tx: Mutex::new(Some(tx)),
            },
            Lane {
                kind,
                windows,
                queue,
            },
        )
    }

    /// Deliver queued lines in order until the queue closes or `cancel` fires.
    pub(crate) async fn run(mut self, link: Arc<Link>, cancel: CancellationToken) {
        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                item = self.queue.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            if !link.wait_for(self.kind.required_stage(), &cancel).await {
                break;
            }
            if let Some(generation) = item.generation {
                if link.generation() != generation {
                    debug!(
                        lane = %self.kind,
                        generation,
                        "connection replaced, dropping message"
                    );
                    if let Some(ack) = item.ack {
                        let _ = ack.send(Err(TransportError::NotConnected));
                    }
                    continue;
                }
            }
            if !throttle(self.kind, &self.windows, &cancel).await {
                break;
            }

            let result = match item.generation {
                Some(generation) => link.send_on(generation, &item.line).await,
                None => link.send(&item.line).await,
            };
            if let Err(e) = &result {
                warn!(lane = %self.kind, error = %e, "write failed, message dropped");
            }
            if let Some(ack) = item.ack {
                let _ = ack.send(result);
            }
        }
        debug!(lane = %self.kind, "lane stopped");
    }
}

/// Count the next message of lane `kind` and stall while any window is full.
/// Returns `false` if cancelled during a stall.
async fn throttle(kind: LaneKind, windows: &[Window], cancel: &CancellationToken) -> bool {
    for window in windows {
        let count = window.record(cancel);
        if !window.is_exhausted(count) {
            continue;
        }

        let quota = window.quota();
        let stall = ClientError::QuotaExceeded {
            lane: kind.as_str(),
            limit: quota.limit,
            window: quota.window,
        };
        warn!(lane = %kind, count, "{}", stall);

        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(quota.window) => {}
        }
    }
    true
}

/// Submission handles for every lane of one session.
pub(crate) struct Outboxes {
    senders: Vec<LaneSender>,
}

impl Outboxes {
    /// Create every lane for an account of `tier`.
    pub(crate) fn new(tier: BotTier) -> (Self, Vec<Lane>) {
        let (senders, lanes): (Vec<_>, Vec<_>) = LaneKind::ALL
            .iter()
            .map(|&kind| Lane::new(kind, tier))
            .unzip();
        (Self { senders }, lanes)
    }

    pub(crate) fn get(&self, kind: LaneKind) -> &LaneSender {
        // senders are built in LaneKind::ALL order
        &self.senders[kind as usize]
    }

    pub(crate) fn close_all(&self) {
        for sender in &self.senders {
            sender.close();
        }
    }
}
