use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Counters shared between the capture thread and observers.
#[derive(Default)]
pub(crate) struct CaptureStats {
    frames_captured: AtomicU64,
    capture_errors: AtomicU64,
    consecutive_failures: AtomicU32,
    last_error: ArcSwapOption<String>,
}

impl CaptureStats {
    pub(crate) fn record_frame(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    /// Returns the number of failures in a row, this one included.
    pub(crate) fn record_error(&self, err: &crate::Error) -> u32 {
        self.capture_errors.fetch_add(1, Ordering::Relaxed);
        self.last_error.store(Some(Arc::new(err.to_string())));
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_error: self.last_error.load_full().map(|e| e.as_ref().clone()),
        }
    }
}

/// Point-in-time view of a stream's capture counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Frames published, including the one captured at construction.
    pub frames_captured: u64,
    pub capture_errors: u64,
    pub consecutive_failures: u32,
    /// Message of the most recent capture error; kept after recovery.
    pub last_error: Option<String>,
}
