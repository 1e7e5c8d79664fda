//! Post-quantum diagnostics.
//!
//! Purely observational: a voice emits one [`QuantumReport`] per quantum when
//! a listener is attached, and nothing at all otherwise. Reports are sent
//! over a bounded channel with drop-on-full `try_send`, so the audio thread
//! never blocks on a slow consumer.

use crate::lockfree::AtomicFlag;
use crate::priority::InstanceId;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;

/// Summary of one instance's quantum, for monitoring sinks.
#[derive(Debug, Clone)]
pub struct QuantumReport {
    pub epoch: u64,
    pub instance: InstanceId,
    /// Last envelope value per channel, linear amplitude.
    pub envelope: Vec<f32>,
    /// Gain applied at the final frame, in dB (<= 0).
    pub gain_db: f32,
    pub percentile: f32,
    pub active_instances: usize,
    pub ranked_instances: usize,
}

impl fmt::Display for QuantumReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {} voice {}: envelope [",
            self.epoch, self.instance
        )?;
        for (i, level) in self.envelope.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{level:.4}")?;
        }
        write!(
            f,
            "] gain {:.2} dB percentile {:.2} ({} active, {} ranked)",
            self.gain_db, self.percentile, self.active_instances, self.ranked_instances
        )
    }
}

/// Telemetry channel with a runtime enable flag.
#[derive(Debug, Default)]
pub struct TelemetryHub {
    enabled: AtomicFlag,
    tx: Mutex<Option<Sender<QuantumReport>>>,
}

impl TelemetryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener and enable emission. Replaces any previous listener.
    pub fn attach(&self) -> Receiver<QuantumReport> {
        let (tx, rx) = crossbeam_channel::bounded(8192);
        *self.tx.lock() = Some(tx);
        self.enabled.set(true);
        rx
    }

    /// Detach the listener; emission becomes a no-op again.
    pub fn detach(&self) {
        self.enabled.set(false);
        *self.tx.lock() = None;
    }

    /// Cheap check for the audio thread to skip report assembly entirely.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Best-effort send. Drops the report if the channel is full or the
    /// sender slot is contended; never blocks.
    pub fn emit(&self, report: QuantumReport) {
        if !self.enabled.get() {
            return;
        }
        if let Some(guard) = self.tx.try_lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.try_send(report);
            }
        }
    }
}
