//! Session configuration.

use std::time::Duration;

use rand::Rng;

use crate::command::outbound::ANONYMOUS_PREFIX;

/// Default chat endpoint.
pub const DEFAULT_SERVER: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Default interval between keepalive probes.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(180);

/// Default time to wait for a keepalive reply.
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(5);

/// Account standing that selects the outbound quotas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum BotTier {
    /// Read-only guest login.
    Anonymous,
    /// Regular account.
    #[default]
    Unverified,
    /// Account registered as a known bot.
    KnownBot,
    /// Account registered as a verified bot.
    VerifiedBot,
}

/// How inbound messages are handed to handlers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DispatchMode {
    /// One dispatch task delivers messages in arrival order.
    #[default]
    Ordered,
    /// One task per message. Handlers may observe messages out of order,
    /// including messages for the same room.
    Concurrent,
}

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
        })
    }
}

/// Settings for one chat session.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// WebSocket address of the chat server.
    pub server: String,
    /// Login name. Empty means an anonymous guest name is generated.
    pub username: String,
    /// OAuth token, with or without the `oauth:` prefix.
    pub token: String,
    /// Log wire traffic and informational numerics at debug level.
    pub debug: bool,
    pub tier: BotTier,
    /// Rooms joined on every connect.
    pub rooms: Vec<String>,
    pub keepalive_interval: Duration,
    pub pong_timeout: Duration,
    pub dispatch: DispatchMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            username: String::new(),
            token: String::new(),
            debug: false,
            tier: BotTier::default(),
            rooms: Vec::new(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            dispatch: DispatchMode::default(),
        }
    }
}

impl Config {
    /// Config for an authenticated account.
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    /// Read-only guest session with a generated name.
    pub fn anonymous() -> Self {
        Self {
            username: guest_name(),
            tier: BotTier::Anonymous,
            ..Self::default()
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_tier(mut self, tier: BotTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_rooms<I, S>(mut self, rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rooms = rooms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keepalive(mut self, interval: Duration, pong_timeout: Duration) -> Self {
        self.keepalive_interval = interval;
        self.pong_timeout = pong_timeout;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Fill in a guest name when no username was given.
    pub(crate) fn resolve_username(&mut self) {
        if self.username.trim().is_empty() {
            self.username = guest_name();
        }
    }
}

/// Random anonymous login name such as `justinfan4821`.
pub fn guest_name() -> String {
    let n: u32 = rand::thread_rng().gen_range(1000..10000);
    format!("{}{}", ANONYMOUS_PREFIX, n)
}
