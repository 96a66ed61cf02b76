use std::time::Duration;

/// Drop-based preview frame rate limiter.
///
/// A frame is forwarded iff at least `1 / max_rate` seconds separate its
/// timestamp from the last forwarded one. Frames that fail the check are
/// dropped, never queued.
#[derive(Debug, Clone)]
pub struct FrameThrottler {
    max_rate: f64,
    min_interval: Option<Duration>,
    last_forwarded: Option<Duration>,
}

impl FrameThrottler {
    pub fn new(max_rate: f64) -> Self {
        let mut throttler = Self {
            max_rate: 0.0,
            min_interval: None,
            last_forwarded: None,
        };
        throttler.configure(max_rate);
        throttler
    }

    /// Set the maximum forwarding rate in frames per second.
    ///
    /// Zero, negative or non-finite rates disable throttling. Rates so small
    /// that `1 / max_rate` overflows a `Duration` forward only the first frame
    /// of a window. `last_forwarded` is kept so a later reconfiguration
    /// measures from the real last frame.
    pub fn configure(&mut self, max_rate: f64) {
        self.max_rate = max_rate;
        self.min_interval = if max_rate.is_finite() && max_rate > 0.0 {
            Some(Duration::try_from_secs_f64(1.0 / max_rate).unwrap_or(Duration::MAX))
        } else {
            None
        };
    }

    /// Decide whether the frame captured at `timestamp` goes downstream.
    pub fn should_forward(&mut self, timestamp: Duration) -> bool {
        let forward = match (self.last_forwarded, self.min_interval) {
            (None, _) | (_, None) => true,
            // A timestamp behind the last forwarded one means the sensor clock
            // restarted; start a new window.
            (Some(last), Some(min)) => match timestamp.checked_sub(last) {
                Some(elapsed) => elapsed >= min,
                None => true,
            },
        };

        if forward {
            self.last_forwarded = Some(timestamp);
        }
        forward
    }

    /// Forget the last forwarded frame so the next one always passes.
    pub fn reset(&mut self) {
        self.last_forwarded = None;
    }

    pub fn max_rate(&self) -> f64 {
        self.max_rate
    }

    pub fn is_throttling(&self) -> bool {
        self.min_interval.is_some()
    }

    pub fn last_forwarded(&self) -> Option<Duration> {
        self.last_forwarded
    }
}
