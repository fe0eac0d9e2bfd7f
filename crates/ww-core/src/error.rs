//! Workspace-wide error.
//!
//! Each crate has its own error enum; all of them convert into [`WwError`] so
//! callers that only care about the broad class of failure can match on one
//! type.

use thiserror::Error;

pub type WwResult<T> = Result<T, WwError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WwError {
    /// A magnitude was NaN or infinite.
    #[error("{what} is not finite: {value}")]
    NonFinite { what: &'static str, value: f64 },

    /// The model as described can't be solved; the caller has to change it.
    #[error("Invalid model: {what}")]
    InvalidModel { what: String },

    /// The model is well-formed but its equations have no unique solution.
    #[error("Numerical failure: {what}")]
    Numerical { what: String },

    /// Internal bookkeeping disagrees with itself, or an API was misused.
    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}

impl WwError {
    pub fn is_model_error(&self) -> bool {
        matches!(self, WwError::InvalidModel { .. } | WwError::NonFinite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = WwError::NonFinite {
            what: "flow",
            value: f64::INFINITY,
        };
        assert_eq!(err.to_string(), "flow is not finite: inf");
        assert!(err.is_model_error());
        assert!(
            !WwError::Numerical {
                what: "singular".into()
            }
            .is_model_error()
        );
    }
}
