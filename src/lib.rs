//! # Ripieno - Cooperative Sidechain Ducking Engine
//!
//! Multiple independent audio voices (one per sound-emitting object) mix
//! their blocks into one shared loudness bus each audio quantum; the bus
//! computes a single running-RMS envelope over the group, and every voice
//! compresses its own audio against that group envelope, weighted by its
//! priority rank relative to the other voices. The name is the
//! concerto-grosso term for the accompanying group that yields to the
//! soloists.
//!
//! ## Architecture
//!
//! Ripieno is an umbrella crate over two members:
//! - **ripieno-core** - Shared bus (aggregate buffer, priority ladder,
//!   epoch gate, telemetry); pure data and synchronization
//! - **ripieno-dsp** - RMS envelope recurrence, soft-knee gain computer,
//!   and the per-voice processor
//!
//! ## Quick Start
//!
//! ```
//! use ripieno::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // One bus per engine session, shared by every voice.
//! let bus = SidechainBus::builder()
//!     .channels(2)
//!     .max_frames(512)
//!     .build()?;
//!
//! let params = DuckerParams::builder()
//!     .threshold_db(-12.0)
//!     .max_ratio(4.0)
//!     .priority_rank(1.0)
//!     .build();
//! let mut voice = DuckerVoice::new(Arc::downgrade(&bus), InstanceId::new(1), params, 48000.0)?;
//!
//! // Once per audio quantum, driven by the host:
//! let mut input = AudioBlock::from_planar(vec![vec![0.5; 512], vec![0.5; 512]]);
//! let mut output = AudioBlock::new(2, 512);
//! voice.process(&mut input, 0, &mut output);
//! # Ok(())
//! # }
//! ```

/// Re-export of ripieno-core for direct access
pub use ripieno_core as bus;

/// Re-export of ripieno-dsp for direct access
pub use ripieno_dsp as dsp;

// Shared bus and data model
pub use ripieno_core::{
    // Lock-free primitives
    AtomicFlag,
    AtomicFloat,
    // Host buffer model
    AudioBlock,
    BusBuilder,
    BusConfig,
    BusSnapshot,
    EnvelopeView,
    // Epoch gate
    EpochGate,
    EpochPhase,
    InstanceId,
    PriorityLadder,
    // Telemetry
    QuantumReport,
    // The bus
    SidechainBus,
    StreamState,
    TelemetryHub,
    DEFAULT_PERCENTILE,
};

// Ducking DSP
pub use ripieno_dsp::{
    ratio_for, DuckerParams, DuckerParamsBuilder, DuckerVoice, GainCurve, RmsEnvelope,
};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        AudioBlock, DuckerParams, DuckerVoice, InstanceId, SidechainBus, StreamState,
    };
}
