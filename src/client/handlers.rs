//! Event callbacks and inbound dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::config::DispatchMode;
use crate::command::Command;
use crate::message::Message;

/// Callback receiving a parsed message.
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

type StatusHandler = Arc<dyn Fn(bool) + Send + Sync>;
type LatencyHandler = Arc<dyn Fn(Duration) + Send + Sync>;

macro_rules! message_handlers {
    ($($(#[$doc:meta])* $field:ident => $setter:ident;)*) => {
        /// Optional callbacks, one slot per event kind.
        ///
        /// Handlers run on the dispatch task and must return quickly; long
        /// work belongs in a task spawned by the handler.
        #[derive(Clone, Default)]
        pub struct Handlers {
            connect: Option<StatusHandler>,
            latency: Option<LatencyHandler>,
            $($field: Option<MessageHandler>,)*
        }

        impl Handlers {
            $(
                $(#[$doc])*
                pub fn $setter<F>(mut self, f: F) -> Self
                where
                    F: Fn(&Message) + Send + Sync + 'static,
                {
                    self.$field = Some(Arc::new(f));
                    self
                }
            )*
        }
    };
}

message_handlers! {
    /// `353` name list entries.
    names => on_names;
    /// `366` end of a name list.
    end_of_names => on_end_of_names;
    privmsg => on_privmsg;
    whisper => on_whisper;
    hosttarget => on_hosttarget;
    notice => on_notice;
    clearchat => on_clearchat;
    clearmsg => on_clearmsg;
    usernotice => on_usernotice;
    globaluserstate => on_globaluserstate;
    userstate => on_userstate;
    roomstate => on_roomstate;
    join => on_join;
    part => on_part;
    /// Any command without a dedicated slot.
    unknown => on_unknown;
}

impl Handlers {
    /// Called with `true` once the server welcomes the login and with
    /// `false` whenever the connection is lost.
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.connect = Some(Arc::new(f));
        self
    }

    /// Called with the round-trip time of every answered keepalive probe.
    pub fn on_latency<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.latency = Some(Arc::new(f));
        self
    }

    pub(crate) fn connected(&self, up: bool) {
        if let Some(f) = &self.connect {
            f(up);
        }
    }

    pub(crate) fn latency(&self, rtt: Duration) {
        if let Some(f) = &self.latency {
            f(rtt);
        }
    }

    /// Route `msg` to its slot. Unset slots drop the message.
    pub(crate) fn dispatch(&self, msg: &Message, debug: bool) {
        let slot = match &msg.command {
            Command::Welcome => {
                self.connected(true);
                return;
            }
            Command::YourHost
            | Command::Created
            | Command::MyInfo
            | Command::Motd
            | Command::MotdStart
            | Command::EndOfMotd
            | Command::Cap => {
                if debug {
                    debug!(command = %msg.command, raw = %msg.raw, "informational");
                }
                return;
            }
            // answered by the read loop
            Command::Ping | Command::Pong => return,
            Command::NamReply => &self.names,
            Command::EndOfNames => &self.end_of_names,
            Command::Privmsg => &self.privmsg,
            Command::Whisper => &self.whisper,
            Command::HostTarget => &self.hosttarget,
            Command::Notice => &self.notice,
            Command::ClearChat => &self.clearchat,
            Command::ClearMsg => &self.clearmsg,
            Command::UserNotice => &self.usernotice,
            Command::GlobalUserState => &self.globaluserstate,
            Command::UserState => &self.userstate,
            Command::RoomState => &self.roomstate,
            Command::Join => &self.join,
            Command::Part => &self.part,
            Command::Other(_) => &self.unknown,
        };
        if let Some(f) = slot {
            f(msg);
        }
    }
}

/// Hands parsed messages from the read loop to the handlers.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    handlers: Arc<Handlers>,
    debug: bool,
    ordered: Option<mpsc::UnboundedSender<Message>>,
}

impl Dispatcher {
    /// Start dispatching. In ordered mode this spawns the dispatch task,
    /// which stops on `cancel`.
    pub(crate) fn start(
        handlers: Arc<Handlers>,
        mode: DispatchMode,
        debug: bool,
        cancel: CancellationToken,
    ) -> Self {
        let ordered = match mode {
            DispatchMode::Concurrent => None,
            DispatchMode::Ordered => {
                let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
                let handlers = Arc::clone(&handlers);
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            msg = rx.recv() => match msg {
                                Some(msg) => handlers.dispatch(&msg, debug),
                                None => break,
                            },
                        }
                    }
                });
                Some(tx)
            }
        };

        Self {
            handlers,
            debug,
            ordered,
        }
    }

    pub(crate) fn deliver(&self, msg: Message) {
        match &self.ordered {
            Some(tx) => {
                let _ = tx.send(msg);
            }
            None => {
                let handlers = Arc::clone(&self.handlers);
                let debug = self.debug;
                tokio::spawn(async move { handlers.dispatch(&msg, debug) });
            }
        }
    }
}
