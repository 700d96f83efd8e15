//! Builders for outbound protocol lines.
//!
//! Every builder returns a single line without the CRLF terminator; the
//! writer appends it. User-supplied text is sanitized so that one call can
//! never produce more than one protocol line.

/// Host name used in keepalive probes and default PONG replies.
pub const SERVER_HOST: &str = "tmi.twitch.tv";

/// Capabilities requested during login.
pub const CAPABILITIES: &str = "twitch.tv/tags twitch.tv/commands";

/// Pseudo-room that carries whispers.
pub const WHISPER_ROOM: &str = "jtv";

/// Nickname prefix of anonymous, read-only guests.
pub const ANONYMOUS_PREFIX: &str = "justinfan";

/// Whether `user` is an anonymous guest login that must not send `PASS`.
pub fn is_anonymous(user: &str) -> bool {
    user.starts_with(ANONYMOUS_PREFIX)
}

/// Normalize a room name: strip a leading `#` and lowercase it.
pub fn normalize_room(room: &str) -> String {
    room.trim()
        .trim_start_matches('#')
        .to_ascii_lowercase()
}

/// Replace line breaks so the text stays on one protocol line.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

/// `CAP REQ :<caps>`
pub fn cap_req(caps: &str) -> String {
    format!("CAP REQ :{}", caps)
}

/// `PASS oauth:<token>`; a token that already carries the prefix is kept as is.
pub fn pass(token: &str) -> String {
    let token = token.strip_prefix("oauth:").unwrap_or(token);
    format!("PASS oauth:{}", sanitize(token))
}

/// `NICK <user>`
pub fn nick(user: &str) -> String {
    format!("NICK {}", sanitize(user))
}

/// `JOIN #<room>`
pub fn join(room: &str) -> String {
    format!("JOIN #{}", normalize_room(room))
}

/// `PART #<room>`
pub fn part(room: &str) -> String {
    format!("PART #{}", normalize_room(room))
}

/// `PRIVMSG #<room> :<text>`
pub fn privmsg(room: &str, text: &str) -> String {
    format!("PRIVMSG #{} :{}", normalize_room(room), sanitize(text))
}

/// `PRIVMSG #jtv :/w <nick> <text>`
pub fn whisper(nick: &str, text: &str) -> String {
    format!(
        "PRIVMSG #{} :/w {} {}",
        WHISPER_ROOM,
        sanitize(nick.trim()),
        sanitize(text)
    )
}

/// `PING :<host>`
pub fn ping(host: &str) -> String {
    format!("PING :{}", host)
}

/// `PONG :<host>`
pub fn pong(host: &str) -> String {
    format!("PONG :{}", host)
}

/// The login sequence for `user`: capability request, password unless
/// anonymous, nickname.
pub fn login(user: &str, token: &str) -> Vec<String> {
    let mut lines = vec![cap_req(CAPABILITIES)];
    if !is_anonymous(user) {
        lines.push(pass(token));
    }
    lines.push(nick(user));
    lines
}
