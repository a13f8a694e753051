//! Transfer state machine.
//!
//! One control connection, at most one data socket. The control loop owns
//! all transfer state; the data receive runs on its own task and reports
//! back through an outcome channel, so a dying control connection never
//! takes a running download with it.

use std::cmp;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use xdcc_file_ops::sanitize_filename;
use xdcc_irc::{IrcClient, IrcEvent, TlsMode};
use xdcc_proxy::Dialer;

use crate::dcc::{CtcpCommand, Offer};
use crate::event::{ErrorKind, EventSender, TransferEvent};
use crate::speed::SpeedMeter;
use crate::{Config, TransferError};

/// Reconnect budget for the control connection.
pub const MAX_CONN_ATTEMPTS: u32 = 5;

/// Back-off between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Data-socket read buffer. DCC bots often send short packets; a small
/// buffer keeps progress updates prompt at the cost of more syscalls.
const DOWNLOAD_BUF_SIZE: usize = 1024;

/// Lifecycle phases of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    Connecting,
    Connected,
    Joined,
    Requested,
    Receiving,
    Completed,
    Aborted,
}

type DataOutcome = Result<(), TransferError>;

/// One connection attempt of one transfer. Created by the retry ladder.
pub(crate) struct Transfer {
    config: Arc<Config>,
    dialer: Dialer,
    mode: TlsMode,
    events: EventSender,
    url: String,
    phase: Phase,
    conn_attempts: u32,
    /// Set once the DCC offer is accepted. Written only by the control
    /// loop; guards against a re-join issuing a second `xdcc send`.
    started: bool,
}

enum Step {
    Irc(Option<IrcEvent>),
    Data(DataOutcome),
}

impl Transfer {
    pub(crate) fn new(
        config: Arc<Config>,
        dialer: Dialer,
        mode: TlsMode,
        events: EventSender,
    ) -> Self {
        let url = config.file.canonical();
        Self {
            config,
            dialer,
            mode,
            events,
            url,
            phase: Phase::Init,
            conn_attempts: 0,
            started: false,
        }
    }

    /// Opens the initial control connection.
    ///
    /// Emits `Connecting`; a dial or TLS failure here is returned so the
    /// fallback ladder can demote to the next mode.
    pub(crate) async fn start(&mut self) -> Result<IrcClient, TransferError> {
        self.phase = Phase::Connecting;
        self.events.emit(TransferEvent::Connecting {
            url: self.url.clone(),
            network: self.config.file.network.clone(),
            channel: self.config.file.channel.clone(),
            bot: self.config.file.bot.clone(),
            slot: self.config.file.slot,
            ssl: self.mode.uses_tls(),
        });
        self.dial_control().await
    }

    async fn dial_control(&self) -> Result<IrcClient, TransferError> {
        let port = self
            .config
            .file
            .port
            .unwrap_or_else(|| self.mode.default_port());
        Ok(IrcClient::connect(&self.dialer, &self.config.file.network, port, self.mode).await?)
    }

    /// Runs the transfer to completion on an established connection.
    pub(crate) async fn run(mut self, mut client: IrcClient) {
        // Outcome of the (at most one) data task. The sender half stays
        // alive here so `recv` pends instead of closing before a task runs.
        let (data_tx, mut data_rx) = mpsc::channel::<DataOutcome>(1);

        loop {
            let step = tokio::select! {
                ev = client.next_event() => Step::Irc(ev),
                Some(result) = data_rx.recv() => Step::Data(result),
            };

            match step {
                Step::Data(result) => {
                    self.finish(result);
                    return;
                }

                Step::Irc(Some(IrcEvent::Registered)) => {
                    self.conn_attempts = 0;
                    self.phase = Phase::Connected;
                    self.events.emit(TransferEvent::Connected {
                        url: self.url.clone(),
                    });
                    let _ = client.sender().join(&self.config.file.channel).await;
                }

                Step::Irc(Some(IrcEvent::Joined { channel })) => {
                    if channel.eq_ignore_ascii_case(&self.config.file.channel) && !self.started {
                        self.phase = Phase::Joined;
                        let request = format!("xdcc send #{}", self.config.file.slot);
                        debug!(bot = %self.config.file.bot, %request, "requesting pack");
                        let _ = client
                            .sender()
                            .privmsg(&self.config.file.bot, &request)
                            .await;
                        self.phase = Phase::Requested;
                    }
                }

                Step::Irc(Some(IrcEvent::Ctcp { from, body })) => {
                    if !self.handle_ctcp(from.as_deref(), &body, &data_tx) {
                        return;
                    }
                }

                Step::Irc(Some(IrcEvent::ServerError { message })) => {
                    self.events.emit(TransferEvent::Error {
                        url: self.url.clone(),
                        message,
                        kind: ErrorKind::Irc,
                        fatal: false,
                    });
                }

                Step::Irc(Some(IrcEvent::Privmsg { .. }))
                | Step::Irc(Some(IrcEvent::Notice { .. })) => {}

                Step::Irc(Some(IrcEvent::Disconnected { reason })) => {
                    if !self.on_disconnect(&reason, &mut client, &mut data_rx).await {
                        return;
                    }
                }
                Step::Irc(None) => {
                    if !self
                        .on_disconnect("connection lost", &mut client, &mut data_rx)
                        .await
                    {
                        return;
                    }
                }
            }
        }
    }

    /// Reacts to a dead control connection. Returns `false` when the
    /// transfer is over and the caller must stop.
    async fn on_disconnect(
        &mut self,
        reason: &str,
        client: &mut IrcClient,
        data_rx: &mut mpsc::Receiver<DataOutcome>,
    ) -> bool {
        debug!(url = %self.url, phase = ?self.phase, %reason, "control connection lost");

        if let Some(new_client) = self.reconnect(reason).await {
            *client = new_client;
            return true;
        }

        if self.started {
            // The data socket is independent of the control channel;
            // keep waiting for the download to finish.
            debug!(url = %self.url, "control channel lost, download continues");
            if let Some(result) = data_rx.recv().await {
                self.finish(result);
            }
            return false;
        }

        self.phase = Phase::Aborted;
        self.events.emit(TransferEvent::Aborted {
            url: self.url.clone(),
            reason: "max connection attempts exceeded".into(),
        });
        false
    }

    /// Reconnects with a fixed back-off until the budget runs out.
    async fn reconnect(&mut self, reason: &str) -> Option<IrcClient> {
        while self.conn_attempts < MAX_CONN_ATTEMPTS {
            self.conn_attempts += 1;
            self.events.emit(TransferEvent::Retry {
                url: self.url.clone(),
                attempt: self.conn_attempts,
                max_attempts: MAX_CONN_ATTEMPTS,
                reason: reason.to_string(),
            });
            tokio::time::sleep(RECONNECT_DELAY).await;

            match self.dial_control().await {
                Ok(client) => return Some(client),
                Err(e) => {
                    warn!(url = %self.url, attempt = self.conn_attempts, error = %e, "reconnect failed")
                }
            }
        }
        None
    }

    /// Handles one CTCP message. Returns `false` on a fatal parse error.
    fn handle_ctcp(
        &mut self,
        from: Option<&str>,
        body: &str,
        data_tx: &mpsc::Sender<DataOutcome>,
    ) -> bool {
        match CtcpCommand::parse(body) {
            // Answered by the IRC layer.
            Ok(CtcpCommand::Version) => true,
            Ok(CtcpCommand::Send(offer)) => {
                if self.started {
                    debug!(from = ?from, file = %offer.filename, "duplicate offer ignored");
                    return true;
                }
                self.started = true;
                self.phase = Phase::Receiving;
                info!(
                    from = ?from,
                    file = %offer.filename,
                    size = offer.size,
                    "accepting DCC SEND offer"
                );

                let config = self.config.clone();
                let dialer = self.dialer.clone();
                let events = self.events.clone();
                let url = self.url.clone();
                let data_tx = data_tx.clone();
                tokio::spawn(async move {
                    let result = receive_file(offer, config, dialer, events, url).await;
                    let _ = data_tx.send(result).await;
                });
                true
            }
            Err(e) => {
                self.fatal(&e);
                false
            }
        }
    }

    fn finish(&mut self, result: DataOutcome) {
        match result {
            Ok(()) => self.phase = Phase::Completed,
            Err(e) => self.fatal(&e),
        }
    }

    /// Terminal failure: one fatal `Error` event ends the stream.
    fn fatal(&mut self, err: &TransferError) {
        self.phase = Phase::Aborted;
        self.events.emit(TransferEvent::Error {
            url: self.url.clone(),
            message: err.to_string(),
            kind: err.kind(),
            fatal: true,
        });
    }
}

/// Receives the announced file over a fresh data connection.
///
/// The target is opened append+create, never truncated: a pre-existing
/// file gets the new stream appended on top, which allows manually staged
/// resumes but corrupts the file if the prior content is unrelated.
async fn receive_file(
    offer: Offer,
    config: Arc<Config>,
    dialer: Dialer,
    events: EventSender,
    url: String,
) -> DataOutcome {
    let file_name = if config.sanitize_filenames {
        sanitize_filename(&offer.filename)
    } else {
        offer.filename.clone()
    };
    let path = config.out_dir.join(&file_name);
    let file_path = path.display().to_string();

    let file = open_target(&path).await.map_err(TransferError::File)?;
    let mut writer = BufWriter::new(file);

    // Plain TCP through the dialer; DCC data is never TLS.
    let mut stream = dialer.dial(&offer.ip.to_string(), offer.port).await?;

    events.emit(TransferEvent::Started {
        url: url.clone(),
        file_name: file_name.clone(),
        file_size: offer.size,
        file_path: file_path.clone(),
    });

    let started_at = Instant::now();
    let mut meter = SpeedMeter::new();
    let mut buf = [0u8; DOWNLOAD_BUF_SIZE];
    let mut received: u64 = 0;

    while received < offer.size {
        let want = cmp::min(offer.size - received, buf.len() as u64) as usize;
        let n = stream
            .read(&mut buf[..want])
            .await
            .map_err(TransferError::Network)?;
        if n == 0 {
            return Err(TransferError::Network(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("data connection closed at {received}/{} bytes", offer.size),
            )));
        }

        writer.write_all(&buf[..n]).await.map_err(TransferError::File)?;
        received += n as u64;

        if let Some(sample) = meter.record(n) {
            events.emit(TransferEvent::Progress {
                url: url.clone(),
                bytes_transferred: sample.cum_bytes,
                total_bytes: offer.size,
                transfer_rate: sample.rate,
            });
        }
    }

    writer.flush().await.map_err(TransferError::File)?;

    let duration_secs = started_at.elapsed().as_secs_f64().max(f64::EPSILON);
    events.emit(TransferEvent::Completed {
        url,
        file_name,
        file_size: offer.size,
        file_path,
        duration_secs,
        avg_rate: offer.size as f64 / duration_secs,
    });
    Ok(())
}

async fn open_target(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    options.mode(0o644);
    options.open(path).await
}
