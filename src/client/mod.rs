//! The chat session.
//!
//! A [`Client`] owns one logical session: it dials the server, logs in,
//! rejoins its rooms after every reconnect, and pushes outbound messages
//! through per-category rate-limited lanes.
//!
//! ```no_run
//! use slirc_tmi::{Client, Config, Handlers};
//!
//! # async fn demo() -> slirc_tmi::Result<()> {
//! let handlers = Handlers::default().on_privmsg(|msg| {
//!     println!("{}: {}", msg.nickname().unwrap_or("?"), msg.text().unwrap_or(""));
//! });
//! let client = Client::with_handlers(Config::anonymous(), handlers);
//! client.join(["rustlang"]);
//! client.run()?;
//! client.closed().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod handlers;
mod keepalive;
mod lane;
mod link;
mod supervisor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use self::config::{
    guest_name, BotTier, Config, ConnectionState, DispatchMode, DEFAULT_KEEPALIVE_INTERVAL,
    DEFAULT_PONG_TIMEOUT, DEFAULT_SERVER,
};
pub use self::handlers::{Handlers, MessageHandler};
pub use self::lane::LaneKind;

use self::handlers::Dispatcher;
use self::lane::{Lane, Outboxes};
use self::link::Link;
use crate::command::outbound;
use crate::error::{ClientError, Result};
use crate::transport::{Connector, WebSocketConnector, NORMAL_CLOSURE};

/// Connection state and the tracked rooms, guarded together.
#[derive(Debug, Default)]
struct Session {
    state: ConnectionState,
    rooms: Vec<String>,
    /// Rooms have been replayed on the current connection; new joins and
    /// parts must be sent directly.
    synced: bool,
}

/// State shared by the client handle and its background tasks.
struct Shared {
    config: Config,
    handlers: Arc<Handlers>,
    session: RwLock<Session>,
    link: Arc<Link>,
    outboxes: Outboxes,
    connector: Arc<dyn Connector>,
    cancel: CancellationToken,
    /// Cancelled by teardown to stop the current connection's read loop.
    connection: Mutex<Option<CancellationToken>>,
    closed: AtomicBool,
    /// Fires once `close` has finished.
    shutdown: CancellationToken,
    pongs: mpsc::Sender<()>,
}

impl Shared {
    /// Move to `state` unless the session has been closed.
    fn transition(&self, state: ConnectionState) {
        let mut session = self.session.write();
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if session.state != state {
            debug!(from = %session.state, to = %state, "state change");
            session.state = state;
        }
    }

    /// Token for a new connection's tasks, replacing any previous one.
    fn open_connection(&self) -> CancellationToken {
        let token = self.cancel.child_token();
        if let Some(previous) = self.connection.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Drop the current connection, if any.
    async fn teardown(&self) {
        self.session.write().synced = false;
        if let Some(connection) = self.connection.lock().take() {
            connection.cancel();
        }
        if let Some(mut writer) = self.link.take().await {
            if let Err(e) = writer.close(NORMAL_CLOSURE, "").await {
                debug!(error = %e, "error closing connection");
            }
        }
    }
}

/// Background work created by `new` and started by `run`.
struct Pending {
    lanes: Vec<Lane>,
    failures: mpsc::UnboundedReceiver<u64>,
    pongs: mpsc::Receiver<()>,
}

/// Handle to a chat session. Clones share the session.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
    pending: Arc<Mutex<Option<Pending>>>,
}

impl Client {
    /// Session without handlers, over WebSocket.
    pub fn new(config: Config) -> Self {
        Self::with_handlers(config, Handlers::default())
    }

    /// Session with `handlers`, over WebSocket.
    pub fn with_handlers(config: Config, handlers: Handlers) -> Self {
        Self::with_connector(config, handlers, WebSocketConnector)
    }

    /// Session over a custom transport.
    pub fn with_connector(
        mut config: Config,
        handlers: Handlers,
        connector: impl Connector,
    ) -> Self {
        config.resolve_username();

        let mut rooms: Vec<String> = Vec::new();
        for room in config.rooms.iter().map(String::as_str).map(outbound::normalize_room) {
            if !room.is_empty() && !rooms.contains(&room) {
                rooms.push(room);
            }
        }

        let (link, failures) = Link::new(config.debug);
        let (outboxes, lanes) = Outboxes::new(config.tier);
        let (pong_tx, pongs) = mpsc::channel(1);

        let shared = Arc::new(Shared {
            handlers: Arc::new(handlers),
            session: RwLock::new(Session {
                rooms,
                ..Session::default()
            }),
            link: Arc::new(link),
            outboxes,
            connector: Arc::new(connector),
            cancel: CancellationToken::new(),
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            pongs: pong_tx,
            config,
        });

        Self {
            shared,
            pending: Arc::new(Mutex::new(Some(Pending {
                lanes,
                failures,
                pongs,
            }))),
        }
    }

    /// Start the session's background tasks and return.
    ///
    /// Must be called from within a Tokio runtime. Connecting, logging in
    /// and reconnecting all happen in the background; watch the connect
    /// handler for progress.
    pub fn run(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        let pending = self.pending.lock().take().ok_or(ClientError::AlreadyRunning)?;
        let shared = &self.shared;

        for lane in pending.lanes {
            tokio::spawn(lane.run(Arc::clone(&shared.link), shared.cancel.clone()));
        }

        let dispatcher = Dispatcher::start(
            Arc::clone(&shared.handlers),
            shared.config.dispatch,
            shared.config.debug,
            shared.cancel.clone(),
        );
        tokio::spawn(supervisor::supervise(
            Arc::clone(shared),
            pending.failures,
            dispatcher,
        ));
        tokio::spawn(keepalive::keepalive(Arc::clone(shared), pending.pongs));

        info!(user = %shared.config.username, tier = ?shared.config.tier, "session started");
        Ok(())
    }

    /// Join `rooms`. Rooms already joined are skipped.
    pub fn join<I, S>(&self, rooms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut session = self.shared.session.write();
        for room in rooms {
            let room = outbound::normalize_room(room.as_ref());
            if room.is_empty() || session.rooms.contains(&room) {
                continue;
            }
            if session.synced {
                self.shared
                    .outboxes
                    .get(LaneKind::Join)
                    .submit_for(self.shared.link.generation(), outbound::join(&room));
            }
            session.rooms.push(room);
        }
    }

    /// Leave `rooms`. Rooms not joined are skipped.
    pub fn part<I, S>(&self, rooms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut session = self.shared.session.write();
        for room in rooms {
            let room = outbound::normalize_room(room.as_ref());
            let Some(index) = session.rooms.iter().position(|r| *r == room) else {
                continue;
            };
            session.rooms.remove(index);
            if session.synced {
                self.shared
                    .outboxes
                    .get(LaneKind::Join)
                    .submit_for(self.shared.link.generation(), outbound::part(&room));
            }
        }
    }

    /// Send `text` to `room`. `privileged` selects the moderator quota and
    /// must only be set where the account is a moderator or the broadcaster.
    pub fn say(&self, room: &str, text: &str, privileged: bool) {
        let kind = if privileged {
            LaneKind::Privileged
        } else {
            LaneKind::Chat
        };
        self.shared
            .outboxes
            .get(kind)
            .submit(outbound::privmsg(room, text));
    }

    /// Send a private message to `nick`.
    pub fn whisper(&self, nick: &str, text: &str) {
        self.shared
            .outboxes
            .get(LaneKind::Whisper)
            .submit(outbound::whisper(nick, text));
    }

    /// Drop the current connection and dial again, as the server asks with
    /// `RECONNECT`. Rooms are rejoined as after any other reconnect.
    ///
    /// Does nothing while no connection is up.
    pub fn reconnect(&self) {
        let link = &self.shared.link;
        link.report(link.generation(), &ClientError::ReconnectRequested);
    }

    /// Shut the session down. Safe to call more than once and from several
    /// tasks; only the first call does the work, and every call returns once
    /// the session is `Disconnected`.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            self.shared.shutdown.cancelled().await;
            return;
        }
        let shared = &self.shared;
        shared.session.write().state = ConnectionState::Closing;

        shared.cancel.cancel();
        shared.outboxes.close_all();
        shared.teardown().await;

        shared.session.write().state = ConnectionState::Disconnected;
        shared.shutdown.cancel();
        info!("session closed");
    }

    /// Wait until the session is closed.
    pub async fn closed(&self) {
        self.shared.shutdown.cancelled().await;
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.session.read().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Rooms currently tracked, in join order.
    pub fn rooms(&self) -> Vec<String> {
        self.shared.session.read().rooms.clone()
    }

    /// The login name in use, including a generated guest name.
    pub fn username(&self) -> &str {
        &self.shared.config.username
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("user", &self.shared.config.username)
            .field("state", &self.state())
            .finish()
    }
}
