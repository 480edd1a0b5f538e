//! Classification of raw fault-injection outcomes.
//!
//! Every injection trial ends in exactly one [`ErrorKind`]. The decision is
//! made from the run signal and the lines the run wrote to its error log,
//! checked in a fixed priority order:
//!
//! 1. a line containing `"SDC Not"` → [`ErrorKind::SdcNotDetected`]
//! 2. a line containing `"Validation failed"` → [`ErrorKind::SdcDetected`]
//! 3. a run signal other than success → [`ErrorKind::FailStop`]
//! 4. otherwise → [`ErrorKind::Masked`]
//!
//! # Example
//!
//! ```
//! use sdc_sampling::classify::{ErrorKind, InjectionOutcome, SUCCESS_SIGNAL};
//!
//! let outcome = InjectionOutcome::parse(
//!     "bb|hash_insert|0x4a10|alu|int|add",
//!     SUCCESS_SIGNAL,
//!     vec!["run completed".to_string()],
//! )?;
//! assert_eq!(outcome.function(), "hash_insert");
//! assert_eq!(outcome.classify()?, ErrorKind::Masked);
//! # Ok::<(), sdc_sampling::SimError>(())
//! ```

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run signal recorded for a trial that completed normally.
pub const SUCCESS_SIGNAL: &str = "RunResult.Success";

/// Run signal recorded when validation flagged the trial.
pub const ERROR_DETECTED_SIGNAL: &str = "RunResult.ErrorDetected";

/// Log marker for a corruption that full validation missed.
const SDC_NOT_DETECTED_MARKER: &str = "SDC Not";

/// Log marker for a corruption caught by validation.
const VALIDATION_FAILED_MARKER: &str = "Validation failed";

/// Outcome category of a single injection trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Corruption surfaced and validation caught it.
    SdcDetected,
    /// Corruption surfaced and validation missed it.
    SdcNotDetected,
    /// The fault had no visible effect.
    Masked,
    /// The process terminated abnormally.
    FailStop,
}

impl ErrorKind {
    /// All kinds, in report order.
    pub const ALL: [Self; 4] = [
        Self::SdcDetected,
        Self::SdcNotDetected,
        Self::Masked,
        Self::FailStop,
    ];

    /// Whether this outcome counts toward the detection-rate denominator.
    #[must_use]
    pub fn is_sdc(&self) -> bool {
        matches!(self, Self::SdcDetected | Self::SdcNotDetected)
    }

    /// Upper-case label used in reports.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::SdcDetected => "SDC_DETECTED",
            Self::SdcNotDetected => "SDC_NOT_DETECTED",
            Self::Masked => "MASKED",
            Self::FailStop => "FAIL_STOP",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Location of an injected fault, decoded from its `'|'`-delimited identifier.
///
/// Two layouts occur in recorded datasets. Both keep the function name in the
/// second field; the extended layout carries one extra qualifier before the
/// unit type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionSite {
    /// `prefix|function|pc|hw_type|unit_type|instruction`
    Compact {
        prefix: String,
        function: String,
        pc: String,
        hw_type: String,
        unit_type: String,
        instruction: String,
    },
    /// `prefix|function|pc|hw_type|qualifier|unit_type|instruction`
    Extended {
        prefix: String,
        function: String,
        pc: String,
        hw_type: String,
        qualifier: String,
        unit_type: String,
        instruction: String,
    },
}

impl InjectionSite {
    /// Parse an injection identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MalformedIdentifier`] unless the identifier has
    /// exactly 6 or 7 fields.
    pub fn parse(name: &str) -> Result<Self> {
        let fields: Vec<&str> = name.split('|').collect();
        match fields.as_slice() {
            [prefix, function, pc, hw_type, unit_type, instruction] => Ok(Self::Compact {
                prefix: (*prefix).to_string(),
                function: (*function).to_string(),
                pc: (*pc).to_string(),
                hw_type: (*hw_type).to_string(),
                unit_type: (*unit_type).to_string(),
                instruction: (*instruction).to_string(),
            }),
            [prefix, function, pc, hw_type, qualifier, unit_type, instruction] => {
                Ok(Self::Extended {
                    prefix: (*prefix).to_string(),
                    function: (*function).to_string(),
                    pc: (*pc).to_string(),
                    hw_type: (*hw_type).to_string(),
                    qualifier: (*qualifier).to_string(),
                    unit_type: (*unit_type).to_string(),
                    instruction: (*instruction).to_string(),
                })
            }
            other => Err(SimError::MalformedIdentifier {
                name: name.to_string(),
                fields: other.len(),
            }),
        }
    }

    /// Name of the function the fault was injected into.
    #[must_use]
    pub fn function(&self) -> &str {
        match self {
            Self::Compact { function, .. } | Self::Extended { function, .. } => function,
        }
    }
}

/// One recorded fault-injection trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionOutcome {
    name: String,
    site: InjectionSite,
    signal: String,
    log: Vec<String>,
}

impl InjectionOutcome {
    /// Build an outcome from its raw identifier, run signal and log lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is malformed.
    pub fn parse(name: &str, signal: impl Into<String>, log: Vec<String>) -> Result<Self> {
        let site = InjectionSite::parse(name)?;
        Ok(Self {
            name: name.to_string(),
            site,
            signal: signal.into(),
            log,
        })
    }

    /// Raw identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded injection site.
    #[must_use]
    pub fn site(&self) -> &InjectionSite {
        &self.site
    }

    /// Owning function name.
    #[must_use]
    pub fn function(&self) -> &str {
        self.site.function()
    }

    /// Raw run signal.
    #[must_use]
    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// Error log lines.
    #[must_use]
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Classify this outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InconsistentOutcome`] when the log reports a
    /// validation failure but the run signal is not the error-detected marker.
    pub fn classify(&self) -> Result<ErrorKind> {
        classify(&self.name, &self.signal, &self.log)
    }
}

/// Classify a raw outcome given its run signal and log lines.
///
/// `name` is only used to identify the record in errors.
///
/// # Errors
///
/// Returns [`SimError::InconsistentOutcome`] when the log reports a validation
/// failure but `signal` is not [`ERROR_DETECTED_SIGNAL`].
pub fn classify<S: AsRef<str>>(name: &str, signal: &str, log: &[S]) -> Result<ErrorKind> {
    let contains = |marker: &str| log.iter().any(|line| line.as_ref().contains(marker));

    if contains(SDC_NOT_DETECTED_MARKER) {
        Ok(ErrorKind::SdcNotDetected)
    } else if contains(VALIDATION_FAILED_MARKER) {
        if signal != ERROR_DETECTED_SIGNAL {
            return Err(SimError::InconsistentOutcome {
                name: name.to_string(),
                signal: signal.to_string(),
            });
        }
        Ok(ErrorKind::SdcDetected)
    } else if signal != SUCCESS_SIGNAL {
        Ok(ErrorKind::FailStop)
    } else {
        Ok(ErrorKind::Masked)
    }
}
