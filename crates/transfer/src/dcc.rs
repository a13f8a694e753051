//! CTCP / DCC SEND decoding.

use std::net::Ipv4Addr;

use crate::TransferError;

/// A decoded DCC SEND offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    /// Filename as announced by the bot. Untrusted.
    pub filename: String,
    /// Address the bot listens on, expanded from the packed u32.
    pub ip: Ipv4Addr,
    pub port: u16,
    /// Payload size in bytes.
    pub size: u64,
}

/// CTCP commands the transfer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtcpCommand {
    /// `VERSION` query — answered by the IRC layer, ignored here.
    Version,
    /// A `DCC SEND` offer.
    Send(Offer),
}

impl CtcpCommand {
    /// Parses a CTCP body (framing already stripped).
    ///
    /// A leading `DCC` token is skipped, so both `DCC SEND …` as received
    /// off the wire and a bare `SEND …` parse identically. `SEND` carries
    /// exactly `<filename> <ip-as-u32> <port> <size>`; anything else —
    /// wrong arity, non-numeric fields, unknown commands — is a parse
    /// error, fatal to the transfer.
    pub fn parse(body: &str) -> Result<Self, TransferError> {
        let mut fields = body.split_whitespace().peekable();
        if fields.peek() == Some(&"DCC") {
            fields.next();
        }

        match fields.next() {
            Some("VERSION") => Ok(CtcpCommand::Version),
            Some("SEND") => {
                let args: Vec<&str> = fields.collect();
                let [filename, ip, port, size] = args[..] else {
                    return Err(TransferError::Parse(format!(
                        "SEND expects 4 arguments, got {}",
                        args.len()
                    )));
                };

                let ip: u32 = ip
                    .parse()
                    .map_err(|_| TransferError::Parse(format!("bad IP field {ip:?}")))?;
                let port: u16 = port
                    .parse()
                    .map_err(|_| TransferError::Parse(format!("bad port field {port:?}")))?;
                let size: u64 = size
                    .parse()
                    .map_err(|_| TransferError::Parse(format!("bad size field {size:?}")))?;

                Ok(CtcpCommand::Send(Offer {
                    filename: filename.to_string(),
                    ip: Ipv4Addr::from(ip),
                    port,
                    size,
                }))
            }
            Some(other) => Err(TransferError::Parse(format!("unknown command {other:?}"))),
            None => Err(TransferError::Parse("empty CTCP body".into())),
        }
    }
}
