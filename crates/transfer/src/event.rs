//! Transfer event stream.
//!
//! Producers never block: events go out through a bounded channel with
//! drop-on-full semantics, so a slow consumer can never back-pressure the
//! download. Progress events are regenerable (the next one supersedes), so
//! dropping them is harmless; the channel is deep enough that the
//! non-idempotent bookends survive bursty progress.

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;

/// Event channel depth.
pub const EVENT_CHANNEL_SIZE: usize = 1024;

/// Wire classification for `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Irc,
    File,
    Parse,
    Ssl,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Irc => "irc",
            ErrorKind::File => "file",
            ErrorKind::Parse => "parse",
            ErrorKind::Ssl => "ssl",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a transfer reports, in production order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// A control-connection attempt is starting.
    Connecting {
        url: String,
        network: String,
        channel: String,
        bot: String,
        slot: u32,
        ssl: bool,
    },
    /// IRC registration completed.
    Connected { url: String },
    /// The DCC data connection is open and the file is being received.
    Started {
        url: String,
        file_name: String,
        file_size: u64,
        file_path: String,
    },
    /// Periodic progress; `bytes_transferred` is cumulative.
    Progress {
        url: String,
        bytes_transferred: u64,
        total_bytes: u64,
        transfer_rate: f64,
    },
    /// All bytes received and flushed.
    Completed {
        url: String,
        file_name: String,
        file_size: u64,
        file_path: String,
        duration_secs: f64,
        avg_rate: f64,
    },
    /// An error; `fatal` errors terminate the transfer's stream.
    Error {
        url: String,
        message: String,
        kind: ErrorKind,
        fatal: bool,
    },
    /// The transfer gave up before completing.
    Aborted { url: String, reason: String },
    /// The control connection dropped and a reconnect is scheduled.
    Retry {
        url: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
    },
}

/// Creates the event channel a transfer writes into.
pub fn channel() -> (EventSender, mpsc::Receiver<TransferEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    (EventSender { tx }, rx)
}

/// Non-blocking producer handle for [`TransferEvent`]s.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<TransferEvent>,
}

impl EventSender {
    /// Emits one event. Never blocks: when the channel is full or the
    /// consumer is gone the event is dropped.
    pub fn emit(&self, event: TransferEvent) {
        if let Err(e) = self.tx.try_send(event) {
            trace!("event dropped: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_delivers_in_order() {
        let (tx, mut rx) = channel();
        tx.emit(TransferEvent::Connected { url: "a".into() });
        tx.emit(TransferEvent::Aborted {
            url: "a".into(),
            reason: "x".into(),
        });

        assert!(matches!(
            rx.recv().await,
            Some(TransferEvent::Connected { .. })
        ));
        assert!(matches!(rx.recv().await, Some(TransferEvent::Aborted { .. })));
    }

    #[tokio::test]
    async fn overflow_drops_instead_of_blocking() {
        let (tx, mut rx) = channel();
        for i in 0..EVENT_CHANNEL_SIZE + 100 {
            tx.emit(TransferEvent::Progress {
                url: "a".into(),
                bytes_transferred: i as u64,
                total_bytes: 0,
                transfer_rate: 0.0,
            });
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, EVENT_CHANNEL_SIZE);
    }

    #[test]
    fn emit_after_consumer_drop_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit(TransferEvent::Connected { url: "a".into() });
    }

    #[test]
    fn error_kind_wire_names() {
        assert_eq!(ErrorKind::Network.as_str(), "network");
        assert_eq!(ErrorKind::Irc.as_str(), "irc");
        assert_eq!(ErrorKind::File.as_str(), "file");
        assert_eq!(ErrorKind::Parse.as_str(), "parse");
        assert_eq!(ErrorKind::Ssl.as_str(), "ssl");
        assert_eq!(ErrorKind::Unknown.as_str(), "unknown");
    }
}
