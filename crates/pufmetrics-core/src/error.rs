//! Error taxonomy for the evaluation engine.
//!
//! Every failure here is deterministic given the same input, so nothing is
//! retried. Errors surface at the point of detection and travel up to the
//! sweep driver, which either aborts or records them per point.

use thiserror::Error;

/// Errors raised while normalizing responses or computing metrics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PufError {
    /// A mode, reference or aggregate was requested over zero values.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A challenge has no samples left after sweep filtering.
    #[error("challenge '{challenge}' has no samples")]
    EmptyChallenge { challenge: String },

    /// A bit-slice position lies outside the response word.
    #[error("invalid bit slice: position {position} outside {width}-bit word")]
    InvalidSlice { position: u32, width: u32 },

    /// A slice selects no bits at all.
    #[error("invalid bit slice: no positions selected")]
    EmptySlice,

    /// A word width that cannot hold a response (0 or above 64 bits).
    #[error("unsupported word width {0} (expected 1..=64)")]
    InvalidWidth(u32),

    /// Responses of different bit-lengths were compared.
    #[error("bit-length mismatch: expected {expected}, found {found}")]
    BitLengthMismatch { expected: u32, found: u32 },

    /// Unknown PUF response variant tag.
    #[error("unsupported response variant '{0}'")]
    UnsupportedVariant(String),

    /// A challenge present on one side of a comparison is missing on the other.
    #[error("challenge '{challenge}' missing from {side}")]
    MissingChallenge { challenge: String, side: String },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PufError>;
