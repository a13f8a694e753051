//! IRC line parsing.
//!
//! Only the subset of RFC 1459 framing the transfer needs: an optional
//! `:prefix`, a command (word or numeric), middle parameters and an
//! optional `:trailing` parameter.

/// A parsed IRC protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender prefix without the leading `:`, e.g. `nick!user@host`.
    pub prefix: Option<String>,
    /// Command verb or three-digit numeric, upper-cased as received.
    pub command: String,
    /// Middle parameters.
    pub params: Vec<String>,
    /// Trailing parameter without the leading `:`.
    pub trailing: Option<String>,
}

impl Message {
    /// Parses one line with CR/LF already stripped. Returns `None` for
    /// lines without a command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        if rest.is_empty() {
            return None;
        }

        let prefix = if let Some(after) = rest.strip_prefix(':') {
            let (prefix, tail) = after.split_once(' ')?;
            rest = tail.trim_start_matches(' ');
            Some(prefix.to_string())
        } else {
            None
        };

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing.to_string())),
            None => (rest, None),
        };

        let mut words = head.split_ascii_whitespace();
        let command = words.next()?.to_string();
        let params = words.map(str::to_string).collect();

        Some(Self {
            prefix,
            command,
            params,
            trailing,
        })
    }

    /// The nick portion of the prefix (`nick!user@host` → `nick`).
    pub fn source_nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }

    /// First middle parameter, the usual message target.
    pub fn target(&self) -> Option<&str> {
        self.params.first().map(String::as_str)
    }
}

/// Marker framing CTCP payloads inside PRIVMSG/NOTICE trailing text.
pub const CTCP_MARKER: char = '\x01';

/// Extracts the CTCP body from a trailing parameter, stripping the
/// `\x01` framing. Returns `None` when the text is not CTCP-framed.
pub fn ctcp_body(trailing: &str) -> Option<&str> {
    let body = trailing.strip_prefix(CTCP_MARKER)?;
    Some(body.strip_suffix(CTCP_MARKER).unwrap_or(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_command_with_trailing() {
        let msg = Message::parse(":server.example.org 001 xdcc-cli42 :Welcome\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("server.example.org"));
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["xdcc-cli42"]);
        assert_eq!(msg.trailing.as_deref(), Some("Welcome"));
    }

    #[test]
    fn parses_ping_without_prefix() {
        let msg = Message::parse("PING :token-123").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert!(msg.params.is_empty());
        assert_eq!(msg.trailing.as_deref(), Some("token-123"));
    }

    #[test]
    fn parses_join_echo() {
        let msg = Message::parse(":nick!user@host JOIN #channel").unwrap();
        assert_eq!(msg.source_nick(), Some("nick"));
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.target(), Some("#channel"));
    }

    #[test]
    fn trailing_may_contain_colons_and_spaces() {
        let msg = Message::parse(":a!b@c PRIVMSG #chan :hello :world again").unwrap();
        assert_eq!(msg.trailing.as_deref(), Some("hello :world again"));
    }

    #[test]
    fn empty_line_is_none() {
        assert!(Message::parse("").is_none());
        assert!(Message::parse("\r\n").is_none());
    }

    #[test]
    fn source_nick_without_user_host() {
        let msg = Message::parse(":onlynick JOIN #c").unwrap();
        assert_eq!(msg.source_nick(), Some("onlynick"));
    }

    #[test]
    fn ctcp_framing_is_detected_and_stripped() {
        assert_eq!(
            ctcp_body("\u{1}DCC SEND file 1 2 3\u{1}"),
            Some("DCC SEND file 1 2 3")
        );
        assert_eq!(ctcp_body("\u{1}VERSION\u{1}"), Some("VERSION"));
        // Tolerates a missing closing marker.
        assert_eq!(ctcp_body("\u{1}VERSION"), Some("VERSION"));
        assert_eq!(ctcp_body("plain text"), None);
    }
}
