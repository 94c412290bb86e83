use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared between the capture callback and the send worker.
#[derive(Debug, Default)]
pub struct CaptureCounters {
    pub frames_captured: AtomicU64,
    pub frames_enqueued: AtomicU64,
    pub frames_sent: AtomicU64,
    pub send_failures: AtomicU64,
    pub frames_dropped_overflow: AtomicU64,
    pub conversion_failures: AtomicU64,
    pub bytes_sent: AtomicU64,
}

impl CaptureCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_enqueued: self.frames_enqueued.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            frames_dropped_overflow: self.frames_dropped_overflow.load(Ordering::Relaxed),
            conversion_failures: self.conversion_failures.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub frames_enqueued: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
    pub frames_dropped_overflow: u64,
    pub conversion_failures: u64,
    pub bytes_sent: u64,
}
