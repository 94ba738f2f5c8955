// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Steering Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all steering kernel failures.
///
/// Only malformed input surfaces here. Low confidence, an inactive
/// memory context, or an out-of-range index are guarded no-ops and
/// never produce an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterventionError {
    /// Confidence outside [0, 1] or non-finite.
    #[error("invalid confidence: {0} (must be finite and in [0, 1])")]
    InvalidConfidence(f32),

    /// An active memory context was built without a truth vector.
    #[error("active memory context requires a non-empty truth vector")]
    EmptyTruthVector,

    /// Truth vector and target tensor disagree on length.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Tuning parameter (strength, alpha) is unusable.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// NaN/Inf in an input vector or a computed score.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Architecture name could not be parsed.
    #[error("unknown architecture variant: {0}")]
    UnknownVariant(String),
}

pub type InterventionResult<T> = Result<T, InterventionError>;
