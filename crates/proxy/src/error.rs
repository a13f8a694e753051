//! Error types for the dialer.

/// Errors produced by proxy configuration and dialing.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported proxy scheme in {0:?}, only socks5:// is accepted")]
    UnsupportedScheme(String),

    #[error("proxy URL must include host:port")]
    MissingHost,

    #[error("invalid proxy port: {0}")]
    InvalidPort(String),

    #[error("connection timed out")]
    Timeout,

    #[error("SOCKS5 proxy rejected every offered auth method")]
    NoAcceptableAuth,

    #[error("SOCKS5 proxy rejected the credentials")]
    AuthRejected,

    #[error("SOCKS5 connect failed: {0}")]
    ConnectRejected(&'static str),

    #[error("SOCKS5 protocol error: {0}")]
    Protocol(String),
}
