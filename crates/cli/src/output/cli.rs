//! Progress-bar output for interactive terminals.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use xdcc_transfer::ErrorKind;

use super::TransferOutputFormatter;

const BAR_TEMPLATE: &str =
    "{msg:30!} [{bar:40}] {bytes}/{total_bytes} {bytes_per_sec} ({eta})";

/// Renders one transfer as a progress bar.
///
/// Connection chatter (`connecting`, `connected`, `error`, `retry`) is not
/// displayed; the bar appears on `started` and ends on `completed` or
/// `aborted`.
pub struct CliFormatter {
    multi: MultiProgress,
    bar: Option<ProgressBar>,
    previous_bytes: u64,
}

impl CliFormatter {
    pub fn new(multi: &MultiProgress) -> Self {
        Self {
            multi: multi.clone(),
            bar: None,
            previous_bytes: 0,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl TransferOutputFormatter for CliFormatter {
    fn on_connecting(&mut self, _: &str, _: &str, _: &str, _: &str, _: u32, _: bool) {}

    fn on_connected(&mut self, _: &str) {}

    fn on_started(&mut self, _url: &str, file_name: &str, file_size: u64, _file_path: &str) {
        let bar = self.multi.add(ProgressBar::new(file_size));
        bar.set_style(Self::style());
        bar.set_message(file_name.to_string());
        self.previous_bytes = 0;
        self.bar = Some(bar);
    }

    fn on_progress(&mut self, _url: &str, bytes_transferred: u64, _total: u64, _rate: f64) {
        if let Some(bar) = &self.bar {
            let increment = bytes_transferred.saturating_sub(self.previous_bytes);
            bar.inc(increment);
            self.previous_bytes = bytes_transferred;
        }
    }

    fn on_completed(&mut self, _: &str, _: &str, file_size: u64, _: &str, _: f64, _: f64) {
        if let Some(bar) = self.bar.take() {
            bar.set_position(file_size);
            bar.finish();
        }
    }

    fn on_error(&mut self, _: &str, _: &str, _: ErrorKind, _: bool) {}

    fn on_aborted(&mut self, _url: &str, reason: &str) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(format!("aborted: {reason}"));
        }
    }

    fn on_retry(&mut self, _: &str, _: u32, _: u32, _: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter() -> CliFormatter {
        // A hidden draw target keeps test output clean.
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        CliFormatter::new(&multi)
    }

    #[test]
    fn bar_appears_on_started_and_tracks_progress() {
        let mut f = formatter();
        assert!(f.bar.is_none());

        f.on_started("u", "file.bin", 1000, "/tmp/file.bin");
        let bar = f.bar.clone().expect("bar created on started");
        assert_eq!(bar.length(), Some(1000));

        f.on_progress("u", 250, 1000, 10.0);
        f.on_progress("u", 750, 1000, 10.0);
        assert_eq!(bar.position(), 750);
    }

    #[test]
    fn completed_fills_and_finishes_the_bar() {
        let mut f = formatter();
        f.on_started("u", "file.bin", 1000, "/tmp/file.bin");
        let bar = f.bar.clone().unwrap();

        f.on_progress("u", 400, 1000, 10.0);
        f.on_completed("u", "file.bin", 1000, "/tmp/file.bin", 1.0, 1000.0);

        assert!(f.bar.is_none());
        assert_eq!(bar.position(), 1000);
        assert!(bar.is_finished());
    }

    #[test]
    fn aborted_abandons_the_bar() {
        let mut f = formatter();
        f.on_started("u", "file.bin", 1000, "/tmp/file.bin");
        let bar = f.bar.clone().unwrap();

        f.on_aborted("u", "gave up");
        assert!(f.bar.is_none());
        assert!(bar.is_finished());
    }

    #[test]
    fn chatter_events_do_not_create_a_bar() {
        let mut f = formatter();
        f.on_connecting("u", "n", "#c", "b", 1, true);
        f.on_connected("u");
        f.on_error("u", "boom", ErrorKind::Irc, false);
        f.on_retry("u", 1, 5, "disconnected");
        f.on_progress("u", 100, 1000, 1.0);
        assert!(f.bar.is_none());
    }
}
