use thiserror::Error;

// ---------------------------------------------------------------------------
// HyperspecError – failures raised by the analysis core
// ---------------------------------------------------------------------------

/// Errors produced by the reduction, quartile, filter, band and
/// interpolation routines.
///
/// None of these are retried inside the crate; the caller decides whether to
/// re-acquire data, skip a pixel or abort the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HyperspecError {
    /// Input array rank or axis length does not match what the operation expects.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// The band axis is empty, so a per-pixel mean is undefined.
    #[error("degenerate spectrum: band axis has length 0")]
    DegenerateSpectrum,

    /// Quartiles were requested for a population with no orderable values.
    #[error("empty population: no values to estimate quartiles from")]
    EmptyPopulation,

    /// A wavelength grid is not strictly monotonic (or holds a non-finite value).
    #[error("wavelength grid is not monotonic at index {index} ({previous} -> {current})")]
    NonMonotonicGrid {
        index: usize,
        previous: f64,
        current: f64,
    },

    /// The Tukey fence multiplier is negative or not a finite number.
    #[error("IQR multiplier must be a non-negative number, got {0}")]
    InvalidMultiplier(f64),

    /// Band sigma multipliers are non-finite or the lower one exceeds the upper.
    #[error("invalid band policy: lower sigma {lower} / upper sigma {upper}")]
    InvalidBandPolicy { lower: f64, upper: f64 },
}

impl HyperspecError {
    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        HyperspecError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result alias used throughout the analysis core.
pub type Result<T> = std::result::Result<T, HyperspecError>;
