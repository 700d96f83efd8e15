//! Parsed inbound messages.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};

use crate::command::Command;
use crate::error::MessageParseError;

use super::nom_parser::split_line;
use super::tags::{parse_tags, Tags};

/// Origin of a message, decoded from its prefix.
///
/// A prefix is split on `!` and `@`: one token is a bare host, two tokens
/// are nickname and host, three or more are nickname, username and host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Source {
    pub nickname: Option<String>,
    pub username: Option<String>,
    pub host: String,
}

impl Source {
    /// Decode a raw prefix (without the leading `:`).
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(['!', '@']);
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        let third = parts.next();

        match (second, third) {
            (None, _) => Source {
                nickname: None,
                username: None,
                host: first.to_string(),
            },
            (Some(host), None) => Source {
                nickname: Some(first.to_string()),
                username: None,
                host: host.to_string(),
            },
            (Some(user), Some(host)) => Source {
                nickname: Some(first.to_string()),
                username: Some(user.to_string()),
                host: host.to_string(),
            },
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(nick) = &self.nickname {
            f.write_str(nick)?;
            if let Some(user) = &self.username {
                write!(f, "!{}", user)?;
            }
            f.write_str("@")?;
        }
        f.write_str(&self.host)
    }
}

/// One inbound protocol line, fully decoded.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// The line as received, without its terminator.
    pub raw: String,
    pub tags: Tags,
    pub source: Option<Source>,
    pub command: Command,
    pub params: Vec<String>,
}

impl Message {
    /// Parse one line.
    ///
    /// A trailing CR/LF is tolerated. Missing optional sections are fine;
    /// only a missing command is a failure.
    pub fn parse(line: &str) -> Result<Message, MessageParseError> {
        let parts = split_line(line)?;

        Ok(Message {
            raw: line.trim_end_matches(['\r', '\n']).to_string(),
            tags: parts.tags.map(parse_tags).unwrap_or_default(),
            source: parts.prefix.map(Source::parse),
            command: Command::from(parts.command),
            params: parts.params.into_iter().map(str::to_string).collect(),
        })
    }

    /// Value of tag `key`, if present (possibly empty).
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Room named by the first param that starts with `#`, without the `#`.
    ///
    /// Numerics such as `353` put the room after other params.
    pub fn channel(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.starts_with('#'))
            .map(|p| &p[1..])
    }

    /// Last param, which for chat messages is the message text.
    pub fn text(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Nickname of the sender, if the source carried one.
    pub fn nickname(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.nickname.as_deref())
    }

    /// Server timestamp from the `tmi-sent-ts` tag (milliseconds since epoch).
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.tag("tmi-sent-ts")?.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}
