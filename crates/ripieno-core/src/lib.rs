//! # Ripieno Core - Shared Sidechain Bus
//!
//! Cross-instance coordination state for cooperative ducking: a process-wide
//! aggregation buffer, a priority ladder, an epoch gate and a telemetry hub.
//! Pure data and synchronization; the DSP formulas live in `ripieno-dsp` and
//! are injected through the [`SidechainBus::fill_envelope`] seam.
//!
//! One bus is built per engine session and shared as `Arc<SidechainBus>`;
//! every per-voice processor holds a `Weak` handle. All waits are bounded
//! spins, and a timeout always means "proceed with best-available data".

mod block;
mod bus;
mod epoch;
mod error;
mod lockfree;
mod priority;
mod telemetry;

pub use block::{AudioBlock, StreamState};
pub use bus::{BusBuilder, BusConfig, BusSnapshot, EnvelopeView, SidechainBus};
pub use epoch::{spin_wait, EpochGate, EpochPhase};
pub use error::{Error, Result};
pub use lockfree::{AtomicFlag, AtomicFloat};
pub use priority::{InstanceId, PriorityLadder, DEFAULT_PERCENTILE};
pub use telemetry::{QuantumReport, TelemetryHub};
