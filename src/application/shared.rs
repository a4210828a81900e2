use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{
    detection::Algorithm, frame::DetectionResult, stream::ControllerState,
};

/// Everything behind the single published-state lock.
#[derive(Default)]
pub(crate) struct Published {
    pub(crate) latest: Option<Arc<DetectionResult>>,
    pub(crate) state: ControllerState,
    pub(crate) last_error: Option<String>,
}

/// State shared between the controller, the capture loop and HTTP readers.
///
/// The loop is the only writer of `latest` while streaming. Critical sections
/// only move an `Arc` in or out; nothing is encoded or detected under the lock.
/// Toggles are plain atomics read once per iteration.
pub(crate) struct SharedState {
    slot: Mutex<Published>,
    algorithm: AtomicU8,
    detection_active: AtomicBool,
    consecutive_failures: AtomicU32,
    recoveries: AtomicU32,
    sequence: AtomicU64,
}

impl SharedState {
    pub(crate) fn new(algorithm: Algorithm) -> Self {
        Self {
            slot: Mutex::new(Published::default()),
            algorithm: AtomicU8::new(algorithm.to_u8()),
            detection_active: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            recoveries: AtomicU32::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    pub(crate) fn slot(&self) -> MutexGuard<'_, Published> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn latest(&self) -> Option<Arc<DetectionResult>> {
        self.slot().latest.clone()
    }

    pub(crate) fn publish(&self, result: DetectionResult) {
        let result = Arc::new(result);
        self.slot().latest = Some(result);
    }

    pub(crate) fn state(&self) -> ControllerState {
        self.slot().state
    }

    pub(crate) fn set_state(&self, state: ControllerState) {
        self.slot().state = state;
    }

    /// Moves to `Failed`, drops the stale frame and records why.
    pub(crate) fn fail(&self, reason: String) {
        let mut slot = self.slot();
        slot.state = ControllerState::Failed;
        slot.latest = None;
        slot.last_error = Some(reason);
    }

    /// Back to `Idle` with nothing published.
    pub(crate) fn reset(&self) {
        let mut slot = self.slot();
        slot.state = ControllerState::Idle;
        slot.latest = None;
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.slot().last_error.clone()
    }

    pub(crate) fn algorithm(&self) -> Algorithm {
        Algorithm::from_u8(self.algorithm.load(Ordering::Relaxed))
    }

    pub(crate) fn set_algorithm(&self, algorithm: Algorithm) {
        self.algorithm.store(algorithm.to_u8(), Ordering::Relaxed);
    }

    pub(crate) fn detection_active(&self) -> bool {
        self.detection_active.load(Ordering::Relaxed)
    }

    pub(crate) fn set_detection_active(&self, active: bool) {
        self.detection_active.store(active, Ordering::Relaxed);
    }

    /// Returns the failure count including this one.
    pub(crate) fn record_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub(crate) fn record_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn recoveries(&self) -> u32 {
        self.recoveries.load(Ordering::Relaxed)
    }

    /// Never reset, so sequences keep rising across stop/start cycles.
    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}
