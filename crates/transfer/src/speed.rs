//! Transfer speed accounting.

use std::time::{Duration, Instant};

/// Default reporting window.
const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// A progress reading produced when a window closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    /// Cumulative bytes since the meter was created.
    pub cum_bytes: u64,
    /// Average rate over the closed window, bytes/second.
    pub rate: f64,
}

/// Windowed speed meter for the data socket.
///
/// Call [`record`](Self::record) after every read; a sample comes back
/// whenever at least one window length has elapsed since the last one.
#[derive(Debug)]
pub struct SpeedMeter {
    window: Duration,
    window_start: Instant,
    window_bytes: u64,
    cum_bytes: u64,
}

impl SpeedMeter {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Meter with a custom window, mainly for tests.
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            window_start: Instant::now(),
            window_bytes: 0,
            cum_bytes: 0,
        }
    }

    /// Accounts `n` freshly-read bytes.
    pub fn record(&mut self, n: usize) -> Option<ProgressSample> {
        self.window_bytes += n as u64;
        self.cum_bytes += n as u64;

        let elapsed = self.window_start.elapsed();
        if elapsed <= self.window {
            return None;
        }

        let sample = ProgressSample {
            cum_bytes: self.cum_bytes,
            rate: self.window_bytes as f64 / elapsed.as_secs_f64(),
        };
        self.window_start = Instant::now();
        self.window_bytes = 0;
        Some(sample)
    }

    /// Cumulative bytes recorded so far.
    pub fn cum_bytes(&self) -> u64 {
        self.cum_bytes
    }
}

impl Default for SpeedMeter {
    fn default() -> Self {
        Self::new()
    }
}
