//! IRC client engine: registration, keep-alive and event dispatch.
//!
//! One [`IrcClient`] per control connection. A write pump serializes
//! outbound commands; the read pump parses inbound lines, answers `PING`
//! and nick collisions itself, and forwards everything the transfer cares
//! about as typed [`IrcEvent`]s.

use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use xdcc_proxy::Dialer;

use crate::message::{ctcp_body, Message};
use crate::stream::{self, MaybeTlsStream, TlsMode};
use crate::IrcError;

/// Nick prefix; a random decimal suffix is appended per connection.
pub const NICK_PREFIX: &str = "xdcc-cli";

/// Outbound command queue depth.
const WRITE_QUEUE_SIZE: usize = 64;

/// Inbound event queue depth.
const EVENT_QUEUE_SIZE: usize = 64;

/// Events delivered to the transfer, in receive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// Registration completed (numeric 001).
    Registered,
    /// The server echoed our own JOIN for `channel`.
    Joined { channel: String },
    /// A plain PRIVMSG (CTCP-framed messages are routed as [`IrcEvent::Ctcp`]).
    Privmsg { from: Option<String>, text: String },
    /// A plain NOTICE.
    Notice { from: Option<String>, text: String },
    /// A CTCP message with the `\x01` framing stripped.
    Ctcp { from: Option<String>, body: String },
    /// The server sent an ERROR line.
    ServerError { message: String },
    /// The connection is gone; no further events follow.
    Disconnected { reason: String },
}

/// Cloneable handle for sending commands on the control connection.
#[derive(Clone)]
pub struct IrcSender {
    tx: mpsc::Sender<String>,
}

impl IrcSender {
    /// Queues one raw line (without CRLF).
    pub async fn raw(&self, line: String) -> Result<(), IrcError> {
        self.tx.send(line).await.map_err(|_| IrcError::Closed)
    }

    pub async fn join(&self, channel: &str) -> Result<(), IrcError> {
        self.raw(format!("JOIN {channel}")).await
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<(), IrcError> {
        self.raw(format!("PRIVMSG {target} :{text}")).await
    }

    pub async fn quit(&self) -> Result<(), IrcError> {
        self.raw("QUIT :done".to_string()).await
    }
}

/// An established control connection.
pub struct IrcClient {
    sender: IrcSender,
    events: mpsc::Receiver<IrcEvent>,
}

impl IrcClient {
    /// Dials `host:port` through `dialer`, negotiates TLS per `mode` and
    /// starts registration with a fresh random nick.
    ///
    /// Errors here mean the socket or TLS handshake failed; everything
    /// after that point is reported through the event stream.
    pub async fn connect(
        dialer: &Dialer,
        host: &str,
        port: u16,
        mode: TlsMode,
    ) -> Result<Self, IrcError> {
        let stream = stream::connect(dialer, host, port, mode).await?;
        let (read_half, write_half) = tokio::io::split(stream);

        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);

        tokio::spawn(write_pump(write_half, write_rx));

        let nick = random_nick();
        debug!(%host, port, %nick, "registering");
        let sender = IrcSender { tx: write_tx };
        sender.raw(format!("NICK {nick}")).await?;
        sender.raw(format!("USER {nick} 8 * :{nick}")).await?;

        tokio::spawn(read_pump(read_half, sender.clone(), event_tx, nick));

        Ok(Self {
            sender,
            events: event_rx,
        })
    }

    /// A cloneable command handle.
    pub fn sender(&self) -> IrcSender {
        self.sender.clone()
    }

    /// Next event, or `None` once the connection is torn down and the
    /// final [`IrcEvent::Disconnected`] has been consumed.
    pub async fn next_event(&mut self) -> Option<IrcEvent> {
        self.events.recv().await
    }
}

fn random_nick() -> String {
    format!("{NICK_PREFIX}{}", rand::thread_rng().gen::<u32>())
}

async fn write_pump(
    write_half: tokio::io::WriteHalf<MaybeTlsStream>,
    mut rx: mpsc::Receiver<String>,
) {
    let mut writer = BufWriter::new(write_half);
    while let Some(line) = rx.recv().await {
        trace!(line = %line, "-->");
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("control write failed: {e}");
            return;
        }
        if let Err(e) = writer.write_all(b"\r\n").await {
            warn!("control write failed: {e}");
            return;
        }
        if let Err(e) = writer.flush().await {
            warn!("control flush failed: {e}");
            return;
        }
    }
}

async fn read_pump(
    read_half: tokio::io::ReadHalf<MaybeTlsStream>,
    sender: IrcSender,
    events: mpsc::Sender<IrcEvent>,
    mut nick: String,
) {
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();

    let reason = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break "connection closed by server".to_string(),
            Ok(_) => {
                // IRC has no mandated encoding; tolerate non-UTF-8 bytes.
                let line = String::from_utf8_lossy(&buf);
                trace!(line = %line.trim_end(), "<--");
                let Some(msg) = Message::parse(&line) else {
                    continue;
                };
                if dispatch(&msg, &sender, &events, &mut nick).await.is_err() {
                    // Consumer dropped the event channel; stop reading.
                    return;
                }
            }
            Err(e) => break e.to_string(),
        }
    };

    let _ = events.send(IrcEvent::Disconnected { reason }).await;
}

async fn dispatch(
    msg: &Message,
    sender: &IrcSender,
    events: &mpsc::Sender<IrcEvent>,
    nick: &mut String,
) -> Result<(), mpsc::error::SendError<IrcEvent>> {
    match msg.command.as_str() {
        "PING" => {
            let token = msg
                .trailing
                .as_deref()
                .or_else(|| msg.target())
                .unwrap_or_default();
            let _ = sender.raw(format!("PONG :{token}")).await;
        }
        // Nickname in use: roll a new one and retry.
        "433" => {
            *nick = random_nick();
            debug!(%nick, "nickname in use, retrying");
            let _ = sender.raw(format!("NICK {nick}")).await;
        }
        "001" => events.send(IrcEvent::Registered).await?,
        "ERROR" => {
            events
                .send(IrcEvent::ServerError {
                    message: msg.trailing.clone().unwrap_or_default(),
                })
                .await?
        }
        "JOIN" => {
            if msg.source_nick() == Some(nick.as_str()) {
                let channel = msg
                    .target()
                    .or(msg.trailing.as_deref())
                    .unwrap_or_default()
                    .to_string();
                events.send(IrcEvent::Joined { channel }).await?;
            }
        }
        "PRIVMSG" | "NOTICE" => {
            let from = msg.source_nick().map(str::to_string);
            let text = msg.trailing.clone().unwrap_or_default();
            match ctcp_body(&text).map(str::to_string) {
                Some(body) => {
                    if body == "VERSION" {
                        if let Some(from) = &from {
                            let reply = format!("\u{1}VERSION {NICK_PREFIX}\u{1}");
                            let _ = sender.raw(format!("NOTICE {from} :{reply}")).await;
                        }
                    }
                    events.send(IrcEvent::Ctcp { from, body }).await?;
                }
                None if msg.command == "PRIVMSG" => {
                    events.send(IrcEvent::Privmsg { from, text }).await?
                }
                None => events.send(IrcEvent::Notice { from, text }).await?,
            }
        }
        _ => {}
    }
    Ok(())
}
