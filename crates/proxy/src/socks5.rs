//! SOCKS5 CONNECT handshake (RFC 1928) with optional username/password
//! sub-negotiation (RFC 1929).

use std::net::IpAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::ProxyError;

const SOCKS_VERSION: u8 = 0x05;
const AUTH_VERSION: u8 = 0x01;

const METHOD_NONE: u8 = 0x00;
const METHOD_USER_PASS: u8 = 0x02;
const METHOD_UNACCEPTABLE: u8 = 0xFF;

const CMD_CONNECT: u8 = 0x01;

const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Negotiates a CONNECT tunnel to `host:port` on an already-open proxy
/// connection. The hostname is passed to the proxy unresolved unless it is
/// an IP literal, so DNS happens on the proxy side.
pub(crate) async fn connect(
    stream: &mut TcpStream,
    host: &str,
    port: u16,
    auth: Option<&(String, String)>,
) -> Result<(), ProxyError> {
    // Greeting: offer no-auth, plus user/pass when credentials are set.
    let methods: &[u8] = match auth {
        Some(_) => &[METHOD_NONE, METHOD_USER_PASS],
        None => &[METHOD_NONE],
    };
    let mut greeting = vec![SOCKS_VERSION, methods.len() as u8];
    greeting.extend_from_slice(methods);
    stream.write_all(&greeting).await?;

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice).await?;
    if choice[0] != SOCKS_VERSION {
        return Err(ProxyError::Protocol(format!(
            "unexpected version byte {:#04x}",
            choice[0]
        )));
    }

    match choice[1] {
        METHOD_NONE => {}
        METHOD_USER_PASS => {
            let (user, pass) = auth.ok_or(ProxyError::NoAcceptableAuth)?;
            authenticate(stream, user, pass).await?;
        }
        METHOD_UNACCEPTABLE => return Err(ProxyError::NoAcceptableAuth),
        other => {
            return Err(ProxyError::Protocol(format!(
                "proxy selected unknown auth method {other:#04x}"
            )))
        }
    }

    // CONNECT request.
    let mut request = vec![SOCKS_VERSION, CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            request.push(ATYP_IPV6);
            request.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            let name = host.as_bytes();
            if name.len() > 255 {
                return Err(ProxyError::Protocol("hostname too long".into()));
            }
            request.push(ATYP_DOMAIN);
            request.push(name.len() as u8);
            request.extend_from_slice(name);
        }
    }
    request.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&request).await?;

    // Reply: VER REP RSV ATYP BND.ADDR BND.PORT.
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await?;
    if head[0] != SOCKS_VERSION {
        return Err(ProxyError::Protocol(format!(
            "unexpected version byte {:#04x}",
            head[0]
        )));
    }
    if head[1] != 0x00 {
        return Err(ProxyError::ConnectRejected(reply_message(head[1])));
    }

    // Drain the bound address, its length depends on ATYP.
    match head[3] {
        ATYP_IPV4 => {
            let mut rest = [0u8; 4 + 2];
            stream.read_exact(&mut rest).await?;
        }
        ATYP_IPV6 => {
            let mut rest = [0u8; 16 + 2];
            stream.read_exact(&mut rest).await?;
        }
        ATYP_DOMAIN => {
            let len = stream.read_u8().await? as usize;
            let mut rest = vec![0u8; len + 2];
            stream.read_exact(&mut rest).await?;
        }
        other => {
            return Err(ProxyError::Protocol(format!(
                "unknown bound address type {other:#04x}"
            )))
        }
    }

    Ok(())
}

async fn authenticate(
    stream: &mut TcpStream,
    user: &str,
    pass: &str,
) -> Result<(), ProxyError> {
    if user.len() > 255 || pass.len() > 255 {
        return Err(ProxyError::Protocol("credentials too long".into()));
    }

    let mut msg = vec![AUTH_VERSION, user.len() as u8];
    msg.extend_from_slice(user.as_bytes());
    msg.push(pass.len() as u8);
    msg.extend_from_slice(pass.as_bytes());
    stream.write_all(&msg).await?;

    let mut resp = [0u8; 2];
    stream.read_exact(&mut resp).await?;
    if resp[1] != 0x00 {
        return Err(ProxyError::AuthRejected);
    }
    Ok(())
}

fn reply_message(code: u8) -> &'static str {
    match code {
        0x01 => "general server failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown reply code",
    }
}
