//! Error types for ripieno-dsp.

use thiserror::Error;

/// Voice construction errors. Processing itself never fails: timeouts and
/// malformed blocks degrade to stale values or unity-gain pass-through.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid sample rate: {0}. Must be positive and finite")]
    InvalidSampleRate(f64),

    #[error("Shared bus is gone; the engine session has ended")]
    BusUnavailable,
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
