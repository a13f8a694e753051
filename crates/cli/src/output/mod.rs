//! Transfer event rendering.
//!
//! One formatter per transfer, one method per event variant: the consumer
//! reads the transfer's event channel in order and dispatches. Stdout
//! writes are one line per call, so concurrent transfers interleave by
//! whole events.

mod cli;
mod jsonl;

pub use cli::CliFormatter;
pub use jsonl::{emit_event, JsonlEvent, JsonlFormatter};

use xdcc_transfer::{ErrorKind, TransferEvent};

/// Receives one callback per event variant.
pub trait TransferOutputFormatter {
    fn on_connecting(
        &mut self,
        url: &str,
        network: &str,
        channel: &str,
        bot: &str,
        slot: u32,
        ssl: bool,
    );
    fn on_connected(&mut self, url: &str);
    fn on_started(&mut self, url: &str, file_name: &str, file_size: u64, file_path: &str);
    fn on_progress(&mut self, url: &str, bytes_transferred: u64, total_bytes: u64, rate: f64);
    #[allow(clippy::too_many_arguments)]
    fn on_completed(
        &mut self,
        url: &str,
        file_name: &str,
        file_size: u64,
        file_path: &str,
        duration_secs: f64,
        avg_rate: f64,
    );
    fn on_error(&mut self, url: &str, message: &str, kind: ErrorKind, fatal: bool);
    fn on_aborted(&mut self, url: &str, reason: &str);
    fn on_retry(&mut self, url: &str, attempt: u32, max_attempts: u32, reason: &str);
}

/// Routes an event to the matching formatter callback.
pub fn dispatch(formatter: &mut dyn TransferOutputFormatter, event: &TransferEvent) {
    match event {
        TransferEvent::Connecting {
            url,
            network,
            channel,
            bot,
            slot,
            ssl,
        } => formatter.on_connecting(url, network, channel, bot, *slot, *ssl),
        TransferEvent::Connected { url } => formatter.on_connected(url),
        TransferEvent::Started {
            url,
            file_name,
            file_size,
            file_path,
        } => formatter.on_started(url, file_name, *file_size, file_path),
        TransferEvent::Progress {
            url,
            bytes_transferred,
            total_bytes,
            transfer_rate,
        } => formatter.on_progress(url, *bytes_transferred, *total_bytes, *transfer_rate),
        TransferEvent::Completed {
            url,
            file_name,
            file_size,
            file_path,
            duration_secs,
            avg_rate,
        } => formatter.on_completed(
            url,
            file_name,
            *file_size,
            file_path,
            *duration_secs,
            *avg_rate,
        ),
        TransferEvent::Error {
            url,
            message,
            kind,
            fatal,
        } => formatter.on_error(url, message, *kind, *fatal),
        TransferEvent::Aborted { url, reason } => formatter.on_aborted(url, reason),
        TransferEvent::Retry {
            url,
            attempt,
            max_attempts,
            reason,
        } => formatter.on_retry(url, *attempt, *max_attempts, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl TransferOutputFormatter for Recorder {
        fn on_connecting(&mut self, _: &str, _: &str, _: &str, _: &str, _: u32, _: bool) {
            self.calls.push("connecting");
        }
        fn on_connected(&mut self, _: &str) {
            self.calls.push("connected");
        }
        fn on_started(&mut self, _: &str, _: &str, _: u64, _: &str) {
            self.calls.push("started");
        }
        fn on_progress(&mut self, _: &str, _: u64, _: u64, _: f64) {
            self.calls.push("progress");
        }
        fn on_completed(&mut self, _: &str, _: &str, _: u64, _: &str, _: f64, _: f64) {
            self.calls.push("completed");
        }
        fn on_error(&mut self, _: &str, _: &str, _: ErrorKind, _: bool) {
            self.calls.push("error");
        }
        fn on_aborted(&mut self, _: &str, _: &str) {
            self.calls.push("aborted");
        }
        fn on_retry(&mut self, _: &str, _: u32, _: u32, _: &str) {
            self.calls.push("retry");
        }
    }

    #[test]
    fn every_variant_reaches_its_callback() {
        let url = "irc://h/#c/b/1".to_string();
        let events = [
            TransferEvent::Connecting {
                url: url.clone(),
                network: "h".into(),
                channel: "#c".into(),
                bot: "b".into(),
                slot: 1,
                ssl: true,
            },
            TransferEvent::Connected { url: url.clone() },
            TransferEvent::Started {
                url: url.clone(),
                file_name: "f".into(),
                file_size: 1,
                file_path: "p".into(),
            },
            TransferEvent::Progress {
                url: url.clone(),
                bytes_transferred: 1,
                total_bytes: 2,
                transfer_rate: 3.0,
            },
            TransferEvent::Completed {
                url: url.clone(),
                file_name: "f".into(),
                file_size: 1,
                file_path: "p".into(),
                duration_secs: 0.5,
                avg_rate: 2.0,
            },
            TransferEvent::Error {
                url: url.clone(),
                message: "m".into(),
                kind: ErrorKind::Irc,
                fatal: false,
            },
            TransferEvent::Aborted {
                url: url.clone(),
                reason: "r".into(),
            },
            TransferEvent::Retry {
                url,
                attempt: 1,
                max_attempts: 5,
                reason: "r".into(),
            },
        ];

        let mut recorder = Recorder::default();
        for ev in &events {
            dispatch(&mut recorder, ev);
        }
        assert_eq!(
            recorder.calls,
            vec![
                "connecting",
                "connected",
                "started",
                "progress",
                "completed",
                "error",
                "aborted",
                "retry"
            ]
        );
    }
}
