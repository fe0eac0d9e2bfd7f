//! Load value errors.

use thiserror::Error;
use ww_core::WwError;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised while building or re-splitting load values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// A fractional split must lie strictly inside (0, 1).
    #[error("Fraction for {what} out of range (0, 1): {value}")]
    FractionOutOfRange { what: &'static str, value: f64 },

    /// Constituent magnitudes must be finite.
    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}

impl From<LoadError> for WwError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::FractionOutOfRange { what, value } => WwError::InvalidModel {
                what: format!("fraction for {what} out of range: {value}"),
            },
            LoadError::NonFinite { what, value } => WwError::NonFinite { what, value },
        }
    }
}
