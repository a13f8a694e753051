//! Control-connection transport: plain TCP or TLS over the proxy dialer.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;
use tracing::debug;
use xdcc_proxy::Dialer;

use crate::IrcError;

/// TLS posture for a control connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS with full certificate and hostname verification.
    VerifiedTls,
    /// TLS with certificate and hostname verification disabled.
    InsecureTls,
    /// No TLS.
    Plain,
}

impl TlsMode {
    /// Whether this mode negotiates TLS at all.
    pub fn uses_tls(&self) -> bool {
        !matches!(self, TlsMode::Plain)
    }

    /// Default IRC port for this mode when the URL does not give one.
    pub fn default_port(&self) -> u16 {
        if self.uses_tls() {
            6697
        } else {
            6667
        }
    }
}

/// A control-connection stream, plain or TLS.
pub enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// Dials `host:port` through `dialer` and negotiates TLS per `mode`.
/// The SNI server name is `host`.
pub async fn connect(
    dialer: &Dialer,
    host: &str,
    port: u16,
    mode: TlsMode,
) -> Result<MaybeTlsStream, IrcError> {
    let tcp = dialer.dial(host, port).await?;

    match mode {
        TlsMode::Plain => Ok(MaybeTlsStream::Plain(tcp)),
        TlsMode::VerifiedTls | TlsMode::InsecureTls => {
            let insecure = mode == TlsMode::InsecureTls;
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(insecure)
                .danger_accept_invalid_hostnames(insecure)
                .build()
                .map_err(IrcError::Tls)?;
            let connector = tokio_native_tls::TlsConnector::from(connector);
            let tls = connector
                .connect(host, tcp)
                .await
                .map_err(IrcError::Tls)?;
            debug!(%host, port, insecure, "TLS handshake complete");
            Ok(MaybeTlsStream::Tls(Box::new(tls)))
        }
    }
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_flush(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_follow_tls_mode() {
        assert_eq!(TlsMode::Plain.default_port(), 6667);
        assert_eq!(TlsMode::VerifiedTls.default_port(), 6697);
        assert_eq!(TlsMode::InsecureTls.default_port(), 6697);
    }

    #[test]
    fn uses_tls_flags() {
        assert!(TlsMode::VerifiedTls.uses_tls());
        assert!(TlsMode::InsecureTls.uses_tls());
        assert!(!TlsMode::Plain.uses_tls());
    }
}
