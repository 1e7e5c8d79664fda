//! Error types for ripieno-core.

use thiserror::Error;

/// Error type for ripieno-core operations.
///
/// Only configuration errors surface as `Err`; synchronization timeouts and
/// shape mismatches are handled locally on the audio path and never propagate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid channel count: {0}. Must be at least 1")]
    InvalidChannelCount(usize),

    #[error("Invalid block capacity: {0} frames. Must be at least 1")]
    InvalidBlockCapacity(usize),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
