//! # slirc-tmi
//!
//! A persistent chat client for Twitch-style IRC over WebSocket.
//!
//! ## Features
//!
//! - IRCv3 line parsing with tags, source and trailing params
//! - Typed inbound commands routed to per-event handlers
//! - Automatic reconnect with exponential backoff and room replay
//! - Outbound lanes that honor the server's per-category rate limits
//!   without dropping messages
//! - Ping/pong keepalive with latency reporting

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing messages
//!
//! ```rust
//! use slirc_tmi::{Command, Message};
//!
//! let raw = "@display-name=Nick;tmi-sent-ts=1600000000000 :nick!nick@nick.tmi.twitch.tv PRIVMSG #room :hello there";
//! let message: Message = raw.parse().expect("valid message");
//!
//! assert_eq!(message.command, Command::Privmsg);
//! assert_eq!(message.tag("display-name"), Some("Nick"));
//! assert_eq!(message.channel(), Some("room"));
//! assert_eq!(message.text(), Some("hello there"));
//! ```
//!
//! ### Running a session
//!
//! ```no_run
//! use slirc_tmi::{Client, Config, Handlers};
//!
//! # #[tokio::main]
//! # async fn main() -> slirc_tmi::Result<()> {
//! let handlers = Handlers::default()
//!     .on_connect(|up| println!("connected: {}", up))
//!     .on_privmsg(|msg| println!("{}", msg));
//!
//! let client = Client::with_handlers(Config::new("mybot", "oauth:token"), handlers);
//! client.join(["rustlang"]);
//! client.run()?;
//! client.say("rustlang", "hello", false);
//! client.closed().await;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod message;

#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod ratelimit;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::command::Command;
pub use self::error::{ClientError, MessageParseError, Result};
pub use self::message::{Message, Source, Tags};

#[cfg(feature = "tokio")]
pub use self::client::{
    BotTier, Client, Config, ConnectionState, DispatchMode, Handlers, LaneKind,
};
#[cfg(feature = "tokio")]
pub use self::ratelimit::{Quota, RateCounter};
#[cfg(feature = "tokio")]
pub use self::transport::{Connector, FrameReader, FrameWriter, TransportError};
