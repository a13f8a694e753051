//! TLS fallback ladder.
//!
//! A transfer is attempted with verified TLS first, then TLS without
//! certificate verification, then plaintext. Each rung is a fresh control
//! connection wired into the same event channel, so consumers see one
//! continuous stream. A rung is consumed only when its initial connect
//! fails; a transfer that started and later died does not demote.

use std::sync::Arc;

use tracing::warn;
use xdcc_irc::TlsMode;
use xdcc_proxy::Dialer;

use crate::event::{EventSender, TransferEvent};
use crate::transfer::Transfer;
use crate::{Config, TransferError};

/// Runs one transfer to its terminal event.
///
/// With `ssl_only` set, only the verified-TLS rung is attempted. When
/// every rung fails to connect, the stream ends in `Aborted`.
pub async fn run_transfer(config: Config, dialer: Dialer, events: EventSender) {
    let modes: &[TlsMode] = if config.ssl_only {
        &[TlsMode::VerifiedTls]
    } else {
        &[TlsMode::VerifiedTls, TlsMode::InsecureTls, TlsMode::Plain]
    };

    let url = config.file.canonical();
    let config = Arc::new(config);
    let mut last_err: Option<TransferError> = None;

    for mode in modes {
        let mut transfer = Transfer::new(config.clone(), dialer.clone(), *mode, events.clone());
        match transfer.start().await {
            Ok(client) => {
                transfer.run(client).await;
                return;
            }
            Err(e) => {
                warn!(url = %url, mode = ?mode, error = %e, "connection attempt failed");
                last_err = Some(e);
            }
        }
    }

    let reason = last_err
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no connection attempt succeeded".into());
    events.emit(TransferEvent::Aborted { url, reason });
}
