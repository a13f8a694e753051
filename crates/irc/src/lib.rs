//! Minimal IRC client for XDCC transfers.
//!
//! Implements exactly what a transfer needs: a single TCP/TLS control
//! connection through the proxy [`Dialer`](xdcc_proxy::Dialer), CRLF line
//! framing, registration with nick-collision retry, `PING`/`PONG`
//! keep-alive, and typed dispatch of `JOIN`, `PRIVMSG`/`NOTICE`, CTCP and
//! `ERROR` traffic.

mod client;
mod message;
mod stream;

pub use client::{IrcClient, IrcEvent, IrcSender, NICK_PREFIX};
pub use message::{ctcp_body, Message, CTCP_MARKER};
pub use stream::{MaybeTlsStream, TlsMode};

/// Errors produced while establishing or using the control connection.
#[derive(Debug, thiserror::Error)]
pub enum IrcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("proxy error: {0}")]
    Proxy(#[from] xdcc_proxy::ProxyError),

    #[error("TLS error: {0}")]
    Tls(#[source] native_tls::Error),

    #[error("connection closed")]
    Closed,
}
