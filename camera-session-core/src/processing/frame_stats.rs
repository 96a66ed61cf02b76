use std::time::Duration;

/// Running statistics over the interval between consecutive preview frames.
///
/// Fed with every frame the hardware delivers (before throttling), so it
/// reflects the sensor's native cadence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameIntervalStats {
    frame_count: u64,
    intervals: u64,
    last: Option<Duration>,
    min: Option<Duration>,
    max: Option<Duration>,
    total: Duration,
}

impl FrameIntervalStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame captured at `timestamp`.
    pub fn record(&mut self, timestamp: Duration) {
        self.frame_count += 1;
        let Some(last) = self.last.replace(timestamp) else {
            return;
        };
        // Out-of-order timestamps carry no interval information.
        let Some(interval) = timestamp.checked_sub(last) else {
            return;
        };

        self.intervals += 1;
        self.total += interval;
        self.min = Some(self.min.map_or(interval, |m| m.min(interval)));
        self.max = Some(self.max.map_or(interval, |m| m.max(interval)));
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn min(&self) -> Option<Duration> {
        self.min
    }

    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    /// Mean interval over every measured pair of frames.
    pub fn average(&self) -> Option<Duration> {
        if self.intervals == 0 {
            return None;
        }
        Some(self.total.div_f64(self.intervals as f64))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
