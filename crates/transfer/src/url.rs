//! XDCC URL parsing.

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::TransferError;

/// A fully-qualified file offer: `irc://network[:port]/channel/bot/slot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// IRC server hostname.
    pub network: String,
    /// Explicit server port, if the URL gave one.
    pub port: Option<u16>,
    /// Channel name, always with its `#`/`&` sigil.
    pub channel: String,
    /// Nick of the offering bot.
    pub bot: String,
    /// Pack number on the bot, always positive.
    pub slot: u32,
}

impl FileRef {
    /// Parses `irc://host[:port]/channel/bot/slot`.
    ///
    /// The channel and bot segments are percent-decoded; a channel without
    /// a leading `#` or `&` gets `#` prepended. The slot must be a positive
    /// decimal. No DNS resolution happens here.
    pub fn parse(url: &str) -> Result<Self, TransferError> {
        let invalid = || TransferError::InvalidUrl(url.to_string());

        let rest = url.strip_prefix("irc://").ok_or_else(invalid)?;

        let mut segments = rest.split('/');
        let authority = segments.next().ok_or_else(invalid)?;
        let channel = segments.next().ok_or_else(invalid)?;
        let bot = segments.next().ok_or_else(invalid)?;
        let slot = segments.next().ok_or_else(invalid)?;
        if segments.next().is_some() {
            return Err(invalid());
        }

        let (network, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| invalid())?;
                (host, Some(port))
            }
            None => (authority, None),
        };
        if network.is_empty() {
            return Err(invalid());
        }

        let channel = percent_decode_str(channel)
            .decode_utf8()
            .map_err(|_| invalid())?;
        if channel.is_empty() {
            return Err(invalid());
        }
        let channel = if channel.starts_with(['#', '&']) {
            channel.into_owned()
        } else {
            format!("#{channel}")
        };

        let bot = percent_decode_str(bot)
            .decode_utf8()
            .map_err(|_| invalid())?;
        if bot.is_empty() {
            return Err(invalid());
        }

        let slot = slot.parse::<u32>().map_err(|_| invalid())?;
        if slot == 0 {
            return Err(invalid());
        }

        Ok(Self {
            network: network.to_string(),
            port,
            channel,
            bot: bot.into_owned(),
            slot,
        })
    }

    /// Canonical string form, round-trippable through [`FileRef::parse`].
    pub fn canonical(&self) -> String {
        match self.port {
            Some(port) => format!(
                "irc://{}:{port}/{}/{}/{}",
                self.network, self.channel, self.bot, self.slot
            ),
            None => format!(
                "irc://{}/{}/{}/{}",
                self.network, self.channel, self.bot, self.slot
            ),
        }
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_with_encoded_bot() {
        let file = FileRef::parse("irc://irc.example.org/news/XDCC%7CBot/42").unwrap();
        assert_eq!(file.network, "irc.example.org");
        assert_eq!(file.port, None);
        assert_eq!(file.channel, "#news");
        assert_eq!(file.bot, "XDCC|Bot");
        assert_eq!(file.slot, 42);
    }

    #[test]
    fn explicit_port_is_kept() {
        let file = FileRef::parse("irc://irc.example.org:6697/chan/bot/7").unwrap();
        assert_eq!(file.port, Some(6697));
    }

    #[test]
    fn channel_sigils_are_preserved() {
        let hash = FileRef::parse("irc://host/%23already/bot/1").unwrap();
        assert_eq!(hash.channel, "#already");

        let amp = FileRef::parse("irc://host/%26local/bot/1").unwrap();
        assert_eq!(amp.channel, "&local");
    }

    #[test]
    fn zero_slot_is_invalid() {
        assert!(matches!(
            FileRef::parse("irc://x/y/z/0"),
            Err(TransferError::InvalidUrl(_))
        ));
    }

    #[test]
    fn malformed_urls_are_invalid() {
        for url in [
            "",
            "http://host/chan/bot/1",
            "irc://",
            "irc://host",
            "irc://host/chan",
            "irc://host/chan/bot",
            "irc://host/chan/bot/notanumber",
            "irc://host/chan/bot/-3",
            "irc://host/chan/bot/1/extra",
            "irc://host:badport/chan/bot/1",
            "irc:///chan/bot/1",
        ] {
            assert!(
                matches!(FileRef::parse(url), Err(TransferError::InvalidUrl(_))),
                "should reject {url:?}"
            );
        }
    }

    #[test]
    fn canonical_round_trips() {
        for url in [
            "irc://irc.example.org/news/XDCC%7CBot/42",
            "irc://irc.example.org:6697/chan/bot/7",
            "irc://host/%26local/bot/1",
        ] {
            let first = FileRef::parse(url).unwrap();
            let reparsed = FileRef::parse(&first.canonical()).unwrap();
            assert_eq!(reparsed.canonical(), first.canonical());
            assert_eq!(reparsed, first);
        }
    }
}
