use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::LandmarkFrame;

/// Single-slot hand-off between the detector and the processing thread.
///
/// Posting while a frame is still pending replaces it, so at most one frame waits and the
/// processing thread always sees frames in arrival order.
#[derive(Default)]
pub struct FrameMailbox {
    slot: Mutex<Option<LandmarkFrame>>,
    ready: Condvar,
    replaced: AtomicU64,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if an older pending frame was dropped.
    pub fn post(&self, frame: LandmarkFrame) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let replaced = slot.replace(frame).is_some();
        if replaced {
            self.replaced.fetch_add(1, Ordering::Relaxed);
        }
        drop(slot);
        self.ready.notify_one();
        replaced
    }

    pub fn try_take(&self) -> Option<LandmarkFrame> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Waits up to `timeout` for a frame.
    pub fn take_timeout(&self, timeout: Duration) -> Option<LandmarkFrame> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut slot, _) = self
            .ready
            .wait_timeout_while(slot, timeout, |s| s.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }

    pub fn replaced_count(&self) -> u64 {
        self.replaced.load(Ordering::Relaxed)
    }
}
