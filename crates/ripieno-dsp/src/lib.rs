//! # Ripieno DSP - Ducking Engine
//!
//! The DSP half of the cooperative ducking engine: the running-RMS envelope
//! recurrence over the group aggregate, the priority-weighted soft-knee gain
//! computer, and [`DuckerVoice`], the per-instance processor the host drives
//! once per audio quantum.
//!
//! Coordination state lives in `ripieno-core`; this crate injects the
//! envelope math through the bus's `fill_envelope` seam and applies gain to
//! each voice's private blocks only.

mod envelope;
mod error;
mod gain;
mod params;
mod utils;
mod voice;

pub use envelope::RmsEnvelope;
pub use error::{Error, Result};
pub use gain::{ratio_for, GainCurve};
pub use params::{DuckerParams, DuckerParamsBuilder};
pub use voice::DuckerVoice;
