use std::sync::Mutex;

/// Thread-safe sweep counters.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub read: usize,
    pub analyzed: usize,
    pub skipped: usize,
    pub detections: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_read(&self) {
        self.update(|metrics| metrics.read += 1);
    }

    pub fn record_analyzed(&self, is_detection: bool) {
        self.update(|metrics| {
            metrics.analyzed += 1;
            if is_detection {
                metrics.detections += 1;
            }
        });
    }

    pub fn record_skipped(&self) {
        self.update(|metrics| metrics.skipped += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
