//! Newline-delimited JSON event output.
//!
//! One minified JSON object per event per line on stdout, flushed
//! immediately so a spawning process can stream the events. Zero-valued
//! fields are omitted, matching the consumers of this feed.

use std::io::Write;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use xdcc_transfer::ErrorKind;

use super::TransferOutputFormatter;

/// Flat JSONL event record; unset fields disappear from the wire.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonlEvent {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timestamp: String,

    // connecting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,

    // started / progress / completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_transferred: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_rate: Option<f64>,

    // error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<bool>,

    // retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    // finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_transfers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<u32>,
}

impl JsonlEvent {
    /// A parse-failure line for a URL that never became a transfer.
    pub fn parse_error(url: &str, message: &str) -> Self {
        Self {
            event_type: "error",
            url: Some(url.to_string()),
            error: Some(message.to_string()),
            error_type: Some(ErrorKind::Parse.as_str()),
            fatal: Some(true),
            ..Self::default()
        }
    }

    /// The batch summary emitted after all transfers end.
    pub fn finished(total_transfers: u32, successful: u32, failed: u32) -> Self {
        Self {
            event_type: "finished",
            total_transfers: nz_u32(total_transfers),
            successful: nz_u32(successful),
            failed: nz_u32(failed),
            ..Self::default()
        }
    }
}

/// Stamps the event and writes it as one line, flushed.
pub fn emit_event(mut event: JsonlEvent) {
    event.timestamp = timestamp();
    let line = match serde_json::to_string(&event) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!("failed to serialize event: {e}");
            return;
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

/// UTC RFC 3339 timestamp with second precision.
fn timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    let now = now.replace_nanosecond(0).unwrap_or(now);
    now.format(&Rfc3339).unwrap_or_default()
}

fn nz_u32(v: u32) -> Option<u32> {
    (v != 0).then_some(v)
}

fn nz_u64(v: u64) -> Option<u64> {
    (v != 0).then_some(v)
}

fn nz_f64(v: f64) -> Option<f64> {
    (v != 0.0).then_some(v)
}

/// Streams transfer events as JSONL.
pub struct JsonlFormatter;

impl JsonlFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl TransferOutputFormatter for JsonlFormatter {
    fn on_connecting(
        &mut self,
        url: &str,
        network: &str,
        channel: &str,
        bot: &str,
        slot: u32,
        ssl: bool,
    ) {
        emit_event(JsonlEvent {
            event_type: "connecting",
            url: Some(url.to_string()),
            network: Some(network.to_string()),
            channel: Some(channel.to_string()),
            bot: Some(bot.to_string()),
            slot: nz_u32(slot),
            ssl: ssl.then_some(true),
            ..JsonlEvent::default()
        });
    }

    fn on_connected(&mut self, url: &str) {
        emit_event(JsonlEvent {
            event_type: "connected",
            url: Some(url.to_string()),
            ..JsonlEvent::default()
        });
    }

    fn on_started(&mut self, url: &str, file_name: &str, file_size: u64, file_path: &str) {
        emit_event(JsonlEvent {
            event_type: "started",
            url: Some(url.to_string()),
            file_name: Some(file_name.to_string()),
            file_size: nz_u64(file_size),
            file_path: Some(file_path.to_string()),
            ..JsonlEvent::default()
        });
    }

    fn on_progress(&mut self, url: &str, bytes_transferred: u64, total_bytes: u64, rate: f64) {
        let percentage = if total_bytes > 0 {
            bytes_transferred as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };
        emit_event(JsonlEvent {
            event_type: "progress",
            url: Some(url.to_string()),
            bytes_transferred: nz_u64(bytes_transferred),
            total_bytes: nz_u64(total_bytes),
            percentage: nz_f64(percentage),
            transfer_rate: nz_f64(rate),
            ..JsonlEvent::default()
        });
    }

    fn on_completed(
        &mut self,
        url: &str,
        file_name: &str,
        file_size: u64,
        file_path: &str,
        duration_secs: f64,
        avg_rate: f64,
    ) {
        emit_event(JsonlEvent {
            event_type: "completed",
            url: Some(url.to_string()),
            file_name: Some(file_name.to_string()),
            file_size: nz_u64(file_size),
            file_path: Some(file_path.to_string()),
            duration: nz_f64(duration_secs),
            avg_rate: nz_f64(avg_rate),
            ..JsonlEvent::default()
        });
    }

    fn on_error(&mut self, url: &str, message: &str, kind: ErrorKind, fatal: bool) {
        emit_event(JsonlEvent {
            event_type: "error",
            url: Some(url.to_string()),
            error: Some(message.to_string()),
            error_type: Some(kind.as_str()),
            fatal: fatal.then_some(true),
            ..JsonlEvent::default()
        });
    }

    fn on_aborted(&mut self, url: &str, reason: &str) {
        emit_event(JsonlEvent {
            event_type: "aborted",
            url: Some(url.to_string()),
            reason: Some(reason.to_string()),
            ..JsonlEvent::default()
        });
    }

    fn on_retry(&mut self, url: &str, attempt: u32, max_attempts: u32, reason: &str) {
        emit_event(JsonlEvent {
            event_type: "retry",
            url: Some(url.to_string()),
            attempt: nz_u32(attempt),
            max_attempts: nz_u32(max_attempts),
            reason: Some(reason.to_string()),
            ..JsonlEvent::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_event_field_names() {
        let event = JsonlEvent {
            event_type: "connecting",
            url: Some("irc://h/#c/b/3".into()),
            timestamp: "2025-01-01T00:00:00Z".into(),
            network: Some("h".into()),
            channel: Some("#c".into()),
            bot: Some("b".into()),
            slot: Some(3),
            ssl: Some(true),
            ..JsonlEvent::default()
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r##"{"type":"connecting","url":"irc://h/#c/b/3","timestamp":"2025-01-01T00:00:00Z","network":"h","channel":"#c","bot":"b","slot":3,"ssl":true}"##
        );
    }

    #[test]
    fn zero_fields_are_omitted() {
        let event = JsonlEvent {
            event_type: "connected",
            url: Some("u".into()),
            timestamp: "t".into(),
            ..JsonlEvent::default()
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"connected","url":"u","timestamp":"t"}"#);
    }

    #[test]
    fn progress_uses_camel_case_names() {
        let event = JsonlEvent {
            event_type: "progress",
            url: Some("u".into()),
            timestamp: "t".into(),
            bytes_transferred: Some(512),
            total_bytes: Some(1024),
            percentage: Some(50.0),
            transfer_rate: Some(100.0),
            ..JsonlEvent::default()
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""bytesTransferred":512"#));
        assert!(json.contains(r#""totalBytes":1024"#));
        assert!(json.contains(r#""percentage":50.0"#));
        assert!(json.contains(r#""transferRate":100.0"#));
    }

    #[test]
    fn completed_uses_camel_case_names() {
        let event = JsonlEvent {
            event_type: "completed",
            url: Some("u".into()),
            timestamp: "t".into(),
            file_name: Some("f.bin".into()),
            file_size: Some(42),
            file_path: Some("/tmp/f.bin".into()),
            duration: Some(1.5),
            avg_rate: Some(28.0),
            ..JsonlEvent::default()
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""fileName":"f.bin""#));
        assert!(json.contains(r#""fileSize":42"#));
        assert!(json.contains(r#""filePath":"/tmp/f.bin""#));
        assert!(json.contains(r#""duration":1.5"#));
        assert!(json.contains(r#""avgRate":28.0"#));
    }

    #[test]
    fn parse_error_line_shape() {
        let json = serde_json::to_string(&JsonlEvent::parse_error("bad://url", "invalid IRC URL"))
            .unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""errorType":"parse""#));
        assert!(json.contains(r#""fatal":true"#));
    }

    #[test]
    fn finished_summary_omits_zero_counters() {
        let json = serde_json::to_string(&JsonlEvent::finished(3, 3, 0)).unwrap();
        assert!(json.contains(r#""totalTransfers":3"#));
        assert!(json.contains(r#""successful":3"#));
        assert!(!json.contains("failed"));
    }

    #[test]
    fn timestamp_is_rfc3339_utc() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'), "got {ts}");
        assert!(OffsetDateTime::parse(&ts, &Rfc3339).is_ok());
    }
}
