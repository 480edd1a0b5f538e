//! Fault-injection dataset loading and aggregation.
//!
//! A dataset is the JSON file written by the offline injection campaign:
//!
//! ```json
//! {
//!   "item_get": {
//!     "injection": [
//!       {
//!         "name": "mc|item_get|0x401a2c|reg|int|mov",
//!         "result": { "error": "RunResult.ErrorDetected", "data": { "err": ["Validation failed"] } }
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! Loading classifies every injection and folds the results into a
//! [`FaultProfile`]: per-function counts of detectable and not-detectable
//! corruptions. Masked and fail-stop outcomes are counted in the
//! [`OutcomeCensus`] only.

use crate::classify::{ErrorKind, InjectionOutcome};
use crate::error::{Result, SimError};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawEntry {
    injection: Vec<RawInjection>,
}

#[derive(Debug, Deserialize)]
struct RawInjection {
    name: String,
    result: RawResult,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    error: String,
    #[serde(default)]
    data: RawData,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    #[serde(default)]
    err: Vec<String>,
}

/// All injection outcomes recorded for one benchmark.
#[derive(Debug, Clone, Default)]
pub struct FaultDataset {
    outcomes: Vec<InjectionOutcome>,
}

impl FaultDataset {
    /// Load a dataset from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, is not valid JSON, or holds a
    /// malformed injection identifier.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SimError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(std::io::BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            outcomes = dataset.len(),
            "loaded fault-injection dataset"
        );
        Ok(dataset)
    }

    /// Load a dataset from any reader producing JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON or holds a malformed
    /// injection identifier.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: BTreeMap<String, RawEntry> = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    /// Load a dataset from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON or holds a malformed
    /// injection identifier.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawEntry> = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: BTreeMap<String, RawEntry>) -> Result<Self> {
        let outcomes = raw
            .into_values()
            .flat_map(|entry| entry.injection)
            .map(|inj| InjectionOutcome::parse(&inj.name, inj.result.error, inj.result.data.err))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { outcomes })
    }

    /// Build a dataset from already parsed outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<InjectionOutcome>) -> Self {
        Self { outcomes }
    }

    /// Number of recorded outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the dataset holds no outcomes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Classify every outcome and aggregate per function.
    ///
    /// # Errors
    ///
    /// Returns the first classification error encountered.
    pub fn profile(&self) -> Result<FaultProfile> {
        FaultProfile::from_outcomes(&self.outcomes)
    }
}

/// Number of outcomes per [`ErrorKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCensus {
    pub sdc_detected: usize,
    pub sdc_not_detected: usize,
    pub masked: usize,
    pub fail_stop: usize,
}

impl OutcomeCensus {
    /// Count one outcome.
    pub fn record(&mut self, kind: ErrorKind) {
        *self.slot(kind) += 1;
    }

    /// Number of outcomes of `kind`.
    #[must_use]
    pub fn count(&self, kind: ErrorKind) -> usize {
        match kind {
            ErrorKind::SdcDetected => self.sdc_detected,
            ErrorKind::SdcNotDetected => self.sdc_not_detected,
            ErrorKind::Masked => self.masked,
            ErrorKind::FailStop => self.fail_stop,
        }
    }

    /// Number of outcomes of any kind.
    #[must_use]
    pub fn total(&self) -> usize {
        ErrorKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    fn slot(&mut self, kind: ErrorKind) -> &mut usize {
        match kind {
            ErrorKind::SdcDetected => &mut self.sdc_detected,
            ErrorKind::SdcNotDetected => &mut self.sdc_not_detected,
            ErrorKind::Masked => &mut self.masked,
            ErrorKind::FailStop => &mut self.fail_stop,
        }
    }
}

/// Which fault pool a function belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    /// Function has this many detectable faults.
    Detectable(usize),
    /// Function only has faults validation never catches.
    NotDetectable,
    /// Function has no SDC outcomes at all.
    Missing,
}

/// Per-function SDC counts for one benchmark.
///
/// Functions are kept in sorted order so that a seeded simulation sees the
/// same function set regardless of how the dataset was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultProfile {
    detectable: BTreeMap<String, usize>,
    not_detectable: BTreeMap<String, usize>,
    census: OutcomeCensus,
}

impl FaultProfile {
    /// Create an empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and aggregate a sequence of outcomes.
    ///
    /// # Errors
    ///
    /// Returns the first classification error encountered.
    pub fn from_outcomes<'a, I>(outcomes: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a InjectionOutcome>,
    {
        let mut profile = Self::new();
        for outcome in outcomes {
            profile.record(outcome.function(), outcome.classify()?);
        }
        Ok(profile)
    }

    /// Count one classified outcome for `function`.
    pub fn record(&mut self, function: &str, kind: ErrorKind) {
        self.census.record(kind);
        let pool = match kind {
            ErrorKind::SdcDetected => &mut self.detectable,
            ErrorKind::SdcNotDetected => &mut self.not_detectable,
            ErrorKind::Masked | ErrorKind::FailStop => return,
        };
        *pool.entry(function.to_string()).or_insert(0) += 1;
    }

    /// Add `count` detectable faults for `function`.
    #[must_use]
    pub fn with_detectable(mut self, function: impl Into<String>, count: usize) -> Self {
        *self.detectable.entry(function.into()).or_insert(0) += count;
        self.census.sdc_detected += count;
        self
    }

    /// Add `count` not-detectable faults for `function`.
    #[must_use]
    pub fn with_not_detectable(mut self, function: impl Into<String>, count: usize) -> Self {
        *self.not_detectable.entry(function.into()).or_insert(0) += count;
        self.census.sdc_not_detected += count;
        self
    }

    /// Detectable fault count for `function`, if it has an entry.
    #[must_use]
    pub fn detectable(&self, function: &str) -> Option<usize> {
        self.detectable.get(function).copied()
    }

    /// Not-detectable fault count for `function`, if it has an entry.
    #[must_use]
    pub fn not_detectable(&self, function: &str) -> Option<usize> {
        self.not_detectable.get(function).copied()
    }

    /// Pool membership of `function`; the detectable pool wins when a
    /// function appears in both.
    #[must_use]
    pub fn pool(&self, function: &str) -> Pool {
        match (self.detectable(function), self.not_detectable.contains_key(function)) {
            (Some(count), _) => Pool::Detectable(count),
            (None, true) => Pool::NotDetectable,
            (None, false) => Pool::Missing,
        }
    }

    /// Union of functions in either pool, sorted.
    #[must_use]
    pub fn functions(&self) -> Vec<&str> {
        self.detectable
            .keys()
            .chain(self.not_detectable.keys())
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sum of detectable faults.
    #[must_use]
    pub fn total_detectable(&self) -> usize {
        self.detectable.values().sum()
    }

    /// Sum of not-detectable faults.
    #[must_use]
    pub fn total_not_detectable(&self) -> usize {
        self.not_detectable.values().sum()
    }

    /// Detection-rate denominator.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total_detectable() + self.total_not_detectable()
    }

    /// Outcome counts by kind, including masked and fail-stop.
    #[must_use]
    pub fn census(&self) -> &OutcomeCensus {
        &self.census
    }
}
