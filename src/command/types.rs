//! Inbound command kinds.
//!
//! The command token of every inbound line is decoded once, at parse time,
//! into a [`Command`]. Anything the client does not route is kept verbatim in
//! [`Command::Other`].

/// Command of an inbound message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Command {
    /// `001` RPL_WELCOME, registration succeeded.
    Welcome,
    /// `002` RPL_YOURHOST
    YourHost,
    /// `003` RPL_CREATED
    Created,
    /// `004` RPL_MYINFO
    MyInfo,
    /// `353` RPL_NAMREPLY, room member list.
    NamReply,
    /// `366` RPL_ENDOFNAMES
    EndOfNames,
    /// `372` RPL_MOTD
    Motd,
    /// `375` RPL_MOTDSTART
    MotdStart,
    /// `376` RPL_ENDOFMOTD
    EndOfMotd,
    /// Capability negotiation reply.
    Cap,
    /// Chat message in a room.
    Privmsg,
    /// Private message between two users.
    Whisper,
    /// Host mode started or stopped.
    HostTarget,
    /// Server or room notice.
    Notice,
    /// Messages of a user (or the whole room) were purged.
    ClearChat,
    /// A single message was deleted.
    ClearMsg,
    /// Subscription, raid and similar room events.
    UserNotice,
    /// Identity snapshot sent after login.
    GlobalUserState,
    /// Identity snapshot for one room.
    UserState,
    /// Room settings snapshot.
    RoomState,
    /// A user joined a room.
    Join,
    /// A user left a room.
    Part,
    /// Server keepalive probe.
    Ping,
    /// Reply to a keepalive probe.
    Pong,
    /// Any other command token, verbatim.
    Other(String),
}

impl Command {
    /// The wire token for this command.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Welcome => "001",
            Self::YourHost => "002",
            Self::Created => "003",
            Self::MyInfo => "004",
            Self::NamReply => "353",
            Self::EndOfNames => "366",
            Self::Motd => "372",
            Self::MotdStart => "375",
            Self::EndOfMotd => "376",
            Self::Cap => "CAP",
            Self::Privmsg => "PRIVMSG",
            Self::Whisper => "WHISPER",
            Self::HostTarget => "HOSTTARGET",
            Self::Notice => "NOTICE",
            Self::ClearChat => "CLEARCHAT",
            Self::ClearMsg => "CLEARMSG",
            Self::UserNotice => "USERNOTICE",
            Self::GlobalUserState => "GLOBALUSERSTATE",
            Self::UserState => "USERSTATE",
            Self::RoomState => "ROOMSTATE",
            Self::Join => "JOIN",
            Self::Part => "PART",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Other(s) => s,
        }
    }

    /// Server chatter that is only logged, never routed to a callback.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            Self::YourHost
                | Self::Created
                | Self::MyInfo
                | Self::Motd
                | Self::MotdStart
                | Self::EndOfMotd
                | Self::Cap
        )
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "001" => Self::Welcome,
            "002" => Self::YourHost,
            "003" => Self::Created,
            "004" => Self::MyInfo,
            "353" => Self::NamReply,
            "366" => Self::EndOfNames,
            "372" => Self::Motd,
            "375" => Self::MotdStart,
            "376" => Self::EndOfMotd,
            "CAP" => Self::Cap,
            "PRIVMSG" => Self::Privmsg,
            "WHISPER" => Self::Whisper,
            "HOSTTARGET" => Self::HostTarget,
            "NOTICE" => Self::Notice,
            "CLEARCHAT" => Self::ClearChat,
            "CLEARMSG" => Self::ClearMsg,
            "USERNOTICE" => Self::UserNotice,
            "GLOBALUSERSTATE" => Self::GlobalUserState,
            "USERSTATE" => Self::UserState,
            "ROOMSTATE" => Self::RoomState,
            "JOIN" => Self::Join,
            "PART" => Self::Part,
            "PING" => Self::Ping,
            "PONG" => Self::Pong,
            other => Self::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_commands_roundtrip() {
        for token in [
            "001", "002", "003", "004", "353", "366", "372", "375", "376", "CAP", "PRIVMSG",
            "WHISPER", "HOSTTARGET", "NOTICE", "CLEARCHAT", "CLEARMSG", "USERNOTICE",
            "GLOBALUSERSTATE", "USERSTATE", "ROOMSTATE", "JOIN", "PART", "PING", "PONG",
        ] {
            let cmd = Command::from(token);
            assert!(!matches!(cmd, Command::Other(_)), "{} decoded as Other", token);
            assert_eq!(cmd.as_str(), token);
        }
    }

    #[test]
    fn test_unknown_command_is_kept_verbatim() {
        let cmd = Command::from("RECONNECT");
        assert_eq!(cmd, Command::Other("RECONNECT".to_string()));
        assert_eq!(cmd.to_string(), "RECONNECT");
    }

    #[test]
    fn test_commands_are_case_sensitive() {
        assert_eq!(Command::from("privmsg"), Command::Other("privmsg".into()));
    }

    #[test]
    fn test_informational() {
        assert!(Command::Motd.is_informational());
        assert!(Command::Cap.is_informational());
        assert!(!Command::Welcome.is_informational());
        assert!(!Command::NamReply.is_informational());
    }
}
