//! Error types for detection-rate simulation.
//!
//! Dataset corruption is reported, never repaired: a malformed record stops
//! the run with the variant that names it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while loading datasets or running simulations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Dataset file not found at specified path.
    #[error("dataset not found: {path}")]
    DatasetNotFound { path: PathBuf },

    /// Injection identifier does not have one of the two accepted layouts.
    #[error("malformed injection identifier {name:?}: expected 6 or 7 '|'-separated fields, got {fields}")]
    MalformedIdentifier { name: String, fields: usize },

    /// Validation reported a failure but the run signal disagrees.
    #[error("inconsistent outcome for {name:?}: validation failed but run signal is {signal:?}")]
    InconsistentOutcome { name: String, signal: String },

    /// A traced function belongs to neither fault pool.
    #[error("function {function:?} is in neither the detectable nor the not-detectable pool")]
    UnpooledFunction { function: String },

    /// Nothing to simulate (empty function set or zero fault total).
    #[error("no data: {reason}")]
    NoData { reason: String },

    /// A simulation parameter is out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// I/O error during file operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimError {
    /// Create a new no-data error.
    #[must_use]
    pub fn no_data(reason: impl Into<String>) -> Self {
        Self::NoData {
            reason: reason.into(),
        }
    }

    /// Create a new invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unpooled function error.
    #[must_use]
    pub fn unpooled(function: impl Into<String>) -> Self {
        Self::UnpooledFunction {
            function: function.into(),
        }
    }
}

/// Check that `value` is a probability in `[0, 1]`.
pub(crate) fn ensure_unit_interval(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::invalid_parameter(
            name,
            format!("must be within [0, 1], got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_dataset_not_found() {
        let err = SimError::DatasetNotFound {
            path: PathBuf::from("results/fault_injection/memcached.json"),
        };
        assert_eq!(
            err.to_string(),
            "dataset not found: results/fault_injection/memcached.json"
        );
    }

    #[test]
    fn test_error_display_malformed_identifier() {
        let err = SimError::MalformedIdentifier {
            name: "a|b|c".to_string(),
            fields: 3,
        };
        assert_eq!(
            err.to_string(),
            "malformed injection identifier \"a|b|c\": expected 6 or 7 '|'-separated fields, got 3"
        );
    }

    #[test]
    fn test_error_display_unpooled() {
        let err = SimError::unpooled("hash_lookup");
        assert_eq!(
            err.to_string(),
            "function \"hash_lookup\" is in neither the detectable nor the not-detectable pool"
        );
    }

    #[test]
    fn test_error_display_invalid_parameter() {
        let err = SimError::invalid_parameter("skew", "must be positive");
        assert_eq!(err.to_string(), "invalid parameter skew: must be positive");
    }

    #[test]
    fn test_ensure_unit_interval() {
        assert!(ensure_unit_interval("p", 0.0).is_ok());
        assert!(ensure_unit_interval("p", 1.0).is_ok());
        assert!(ensure_unit_interval("p", 1.5).is_err());
        assert!(ensure_unit_interval("p", -0.1).is_err());
        assert!(ensure_unit_interval("p", f64::NAN).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SimError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }
}
