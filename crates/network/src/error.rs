//! Network configuration errors.

use thiserror::Error;

/// Errors building a data-rate model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    /// Rate is zero, negative or not a number.
    #[error("Data rate must be positive, got {0} bit/s")]
    NonPositive(f64),

    /// Uniform range with `max < min`.
    #[error("Empty data rate range [{min}, {max}]")]
    EmptyRange { min: f64, max: f64 },
}
