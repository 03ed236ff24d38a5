//! Error types for the PetalSonic bridge

use thiserror::Error;

/// Errors raised by fallible setup paths.
///
/// The real-time path never returns these: a missing engine or a declined
/// render is silence, not an error. Contract violations are assertions.
#[derive(Error, Debug)]
pub enum PetalSonicError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Spatial audio error: {0}")]
    SpatialAudio(String),
}

pub type Result<T> = std::result::Result<T, PetalSonicError>;
