//! Proxy-aware dialer.
//!
//! Every outbound connection — the IRC control connection and the DCC data
//! connection alike — goes through a [`Dialer`]. Depending on configuration
//! it opens a direct TCP connection or tunnels through a SOCKS5 proxy
//! (optionally authenticated). The dialer is cheap to clone and is injected
//! into each transfer so tests can substitute a loopback proxy.

mod config;
mod error;
mod socks5;

use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tracing::debug;

pub use config::ProxyConfig;
pub use error::ProxyError;

/// Connect timeout for every outbound socket, proxy handshake included.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP keep-alive interval on established sockets.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Dials outbound TCP connections, directly or through a SOCKS5 proxy.
#[derive(Debug, Clone, Default)]
pub struct Dialer {
    proxy: Option<Arc<ProxyConfig>>,
}

impl Dialer {
    /// Builds a dialer from an explicit proxy URL or the environment.
    ///
    /// An explicit non-empty `proxy_url` wins; otherwise `XDCC_PROXY`,
    /// `ALL_PROXY` and `all_proxy` are consulted in that order. No value
    /// anywhere means direct connections. Validation errors surface here,
    /// before any transfer starts.
    pub fn new(proxy_url: Option<&str>) -> Result<Self, ProxyError> {
        let resolved =
            config::resolve_proxy_url(proxy_url, |var| std::env::var(var).ok());

        let proxy = match resolved {
            Some(url) => Some(Arc::new(ProxyConfig::parse(&url)?)),
            None => None,
        };
        Ok(Self { proxy })
    }

    /// Builds a dialer that tunnels through the given proxy endpoint.
    pub fn with_proxy(proxy: ProxyConfig) -> Self {
        Self {
            proxy: Some(Arc::new(proxy)),
        }
    }

    /// Whether a SOCKS5 proxy is configured.
    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }

    /// Opens a TCP connection to `host:port`.
    ///
    /// The whole operation — TCP connect plus SOCKS5 handshake when a proxy
    /// is configured — is bounded by [`CONNECT_TIMEOUT`]. On the proxied
    /// path the hostname is resolved by the proxy, not locally.
    pub async fn dial(&self, host: &str, port: u16) -> Result<TcpStream, ProxyError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, self.dial_inner(host, port))
            .await
            .map_err(|_| ProxyError::Timeout)??;

        set_keepalive(&stream)?;
        Ok(stream)
    }

    async fn dial_inner(&self, host: &str, port: u16) -> Result<TcpStream, ProxyError> {
        match &self.proxy {
            None => {
                let stream = TcpStream::connect((host, port)).await?;
                debug!(%host, port, "connected");
                Ok(stream)
            }
            Some(proxy) => {
                let mut stream =
                    TcpStream::connect((proxy.host.as_str(), proxy.port)).await?;
                socks5::connect(&mut stream, host, port, proxy.auth.as_ref()).await?;
                debug!(%host, port, proxy = %proxy.host, "connected via SOCKS5");
                Ok(stream)
            }
        }
    }
}

fn set_keepalive(stream: &TcpStream) -> Result<(), ProxyError> {
    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_INTERVAL);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    Ok(())
}
