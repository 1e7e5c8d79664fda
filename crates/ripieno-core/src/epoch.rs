//! Epoch state machine and bounded spin waits.
//!
//! One processing epoch covers a single audio quantum: every active instance
//! contributes exactly once, one winner computes the envelope, everyone
//! applies gain, and the first arrival of the next quantum resets. The phase
//! lives in a single atomic and only moves forward within an epoch, so a
//! reader can never observe a torn combination of readiness flags.

use crate::lockfree::AtomicFlag;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Phase of the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum EpochPhase {
    /// Instances are still contributing audio and priority ranks.
    #[default]
    Collecting = 0,
    /// Every active instance has contributed; the aggregate is complete.
    Aggregated = 1,
    /// The envelope table has been filled from the aggregate.
    EnvelopeReady = 2,
    /// Every active instance has finished the quantum; safe to reset.
    Draining = 3,
}

impl EpochPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EpochPhase::Collecting,
            1 => EpochPhase::Aggregated,
            2 => EpochPhase::EnvelopeReady,
            _ => EpochPhase::Draining,
        }
    }
}

/// Epoch readiness gate: the phase atomic plus the priority-ready flag.
///
/// Spin-waits read only atomics and never take the bus lock.
#[derive(Debug, Default)]
pub struct EpochGate {
    phase: AtomicU8,
    priority_ready: AtomicFlag,
}

impl EpochGate {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn phase(&self) -> EpochPhase {
        EpochPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// True once the phase has reached `phase` or beyond.
    #[inline]
    pub fn at_least(&self, phase: EpochPhase) -> bool {
        self.phase.load(Ordering::Acquire) >= phase as u8
    }

    /// Compare-and-swap transition; exactly one caller wins per edge.
    pub fn try_advance(&self, from: EpochPhase, to: EpochPhase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditional transition. Used under the bus write lock for epoch
    /// completion and reset, where no competing writer can exist.
    pub fn force(&self, phase: EpochPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub fn priority_ready(&self) -> bool {
        self.priority_ready.get()
    }

    pub fn set_priority_ready(&self, ready: bool) {
        self.priority_ready.set(ready);
    }

    /// Back to `Collecting` with readiness cleared, as one epoch boundary.
    pub fn reset(&self) {
        self.priority_ready.set(false);
        self.phase
            .store(EpochPhase::Collecting as u8, Ordering::Release);
    }
}

/// Bounded spin until `ready` holds or `timeout` elapses.
///
/// Real-time audio threads must never block indefinitely; a `false` return
/// means "proceed with best-available data", not an error.
pub fn spin_wait(timeout: Duration, mut ready: impl FnMut() -> bool) -> bool {
    if ready() {
        return true;
    }
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        std::hint::spin_loop();
        if ready() {
            return true;
        }
    }
    ready()
}
