//! core/error.rs — Error kinds surfaced at every component boundary.

use thiserror::Error;

/// Coarse classification of an [`OctaveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Data does not fit together (indices out of range, length mismatch).
    MalformedInput,
    /// A scalar parameter is outside its admissible range.
    InvalidParameter,
    /// Numeric work produced something that cannot be reported honestly.
    NumericDegenerate,
}

/// Errors returned by the analysis core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OctaveError {
    #[error("pair #{pair} references index {index}, but only {len} scale values are available")]
    PairIndexOutOfRange {
        pair: usize,
        index: usize,
        len: usize,
    },
    #[error("{names} names supplied for {values} scale values")]
    LengthMismatch { names: usize, values: usize },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("numerically degenerate result: {reason}")]
    NumericDegenerate { reason: String },
}

impl OctaveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PairIndexOutOfRange { .. } | Self::LengthMismatch { .. } => {
                ErrorKind::MalformedInput
            }
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::NumericDegenerate { .. } => ErrorKind::NumericDegenerate,
        }
    }

    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::NumericDegenerate {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OctaveError>;

/// Reject NaN and infinities for a named scalar.
pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(OctaveError::invalid(name, format!("must be finite, got {value}")))
    }
}
