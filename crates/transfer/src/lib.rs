//! XDCC transfer core.
//!
//! Drives connect → join → request → receive for one file offer: joins the
//! channel on the IRC network, asks the bot for the pack, decodes the DCC
//! SEND handshake, streams the payload to disk and reports everything as a
//! typed event stream. The outer retry ladder falls back from verified TLS
//! to insecure TLS to plaintext, and reconnects the control channel on
//! involuntary disconnects.

mod dcc;
mod event;
mod retry;
mod speed;
mod transfer;
mod url;

use std::path::PathBuf;

pub use dcc::{CtcpCommand, Offer};
pub use event::{channel, ErrorKind, EventSender, TransferEvent, EVENT_CHANNEL_SIZE};
pub use retry::run_transfer;
pub use speed::{ProgressSample, SpeedMeter};
pub use transfer::{Phase, MAX_CONN_ATTEMPTS};
pub use url::FileRef;

/// Everything a transfer needs to know, fixed at creation.
#[derive(Debug, Clone)]
pub struct Config {
    /// What to download and from where.
    pub file: FileRef,
    /// Directory the file lands in.
    pub out_dir: PathBuf,
    /// Only attempt verified TLS; no fallback ladder.
    pub ssl_only: bool,
    /// Run remote filenames through the sanitizer before opening.
    pub sanitize_filenames: bool,
}

/// Errors produced by the transfer core.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid IRC URL: {0}")]
    InvalidUrl(String),

    #[error("malformed CTCP message: {0}")]
    Parse(String),

    #[error("control connection failed: {0}")]
    Control(#[from] xdcc_irc::IrcError),

    #[error("data connection failed: {0}")]
    Dial(#[from] xdcc_proxy::ProxyError),

    #[error("data read failed: {0}")]
    Network(#[source] std::io::Error),

    #[error("file I/O failed: {0}")]
    File(#[source] std::io::Error),
}

impl TransferError {
    /// Wire classification of this error for `error` events.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::InvalidUrl(_) | TransferError::Parse(_) => ErrorKind::Parse,
            TransferError::Control(xdcc_irc::IrcError::Tls(_)) => ErrorKind::Ssl,
            TransferError::Control(_) => ErrorKind::Network,
            TransferError::Dial(_) | TransferError::Network(_) => ErrorKind::Network,
            TransferError::File(_) => ErrorKind::File,
        }
    }
}
