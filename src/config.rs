//! Study configuration.
//!
//! A study is a list of benchmark scenarios sharing one set of engine
//! parameters. Configuration is read from JSON; anything left out falls back
//! to the reference study.
//!
//! ```json
//! {
//!   "engine": { "detection_probability": 0.02, "window_capacity": 1000 },
//!   "seed": 42,
//!   "benchmarks": [
//!     { "name": "Memcached", "skew": 1.2, "trace_len": 50000, "cores": 4 }
//!   ]
//! }
//! ```

use crate::error::{ensure_unit_interval, Result, SimError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default per-validation detection probability `P`.
pub const DEFAULT_DETECTION_PROBABILITY: f64 = 0.02;

/// Default validation window capacity `W`.
pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;

/// Default directory holding per-benchmark datasets.
pub const DEFAULT_RESULTS_DIR: &str = "results/fault_injection";

/// Engine-level constants shared by every benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Probability that validating a corrupted execution flags the fault.
    pub detection_probability: f64,
    /// Pending executions the windowed validator buffers before draining.
    pub window_capacity: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            detection_probability: DEFAULT_DETECTION_PROBABILITY,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl EngineParams {
    /// Override the detection probability.
    #[must_use]
    pub fn with_detection_probability(mut self, p: f64) -> Self {
        self.detection_probability = p;
        self
    }

    /// Override the window capacity.
    #[must_use]
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if `P` is outside `[0, 1]` or `W` is zero.
    pub fn validate(&self) -> Result<()> {
        ensure_unit_interval("detection_probability", self.detection_probability)?;
        if self.window_capacity == 0 {
            return Err(SimError::invalid_parameter(
                "window_capacity",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Shape of the synthetic workload for one benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkloadShape {
    /// Zipf exponent `a`.
    pub skew: f64,
    /// Trace length `n`.
    pub trace_len: usize,
    /// Simulated validation cores `ncpu`.
    pub cores: usize,
}

impl WorkloadShape {
    /// Create a workload shape.
    #[must_use]
    pub fn new(skew: f64, trace_len: usize, cores: usize) -> Self {
        Self {
            skew,
            trace_len,
            cores,
        }
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if `skew` is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if !(self.skew.is_finite() && self.skew > 0.0) {
            return Err(SimError::invalid_parameter(
                "skew",
                format!("must be a positive finite number, got {}", self.skew),
            ));
        }
        Ok(())
    }
}

/// One benchmark to simulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkScenario {
    /// Display name, also the output key.
    pub name: String,
    /// Dataset path; defaults to `<results_dir>/<lowercase name>.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,
    #[serde(flatten)]
    pub workload: WorkloadShape,
}

impl BenchmarkScenario {
    /// Create a scenario using the default dataset location.
    #[must_use]
    pub fn new(name: impl Into<String>, workload: WorkloadShape) -> Self {
        Self {
            name: name.into(),
            dataset: None,
            workload,
        }
    }

    /// Use an explicit dataset path.
    #[must_use]
    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset = Some(path.into());
        self
    }

    /// Resolve the dataset path against `results_dir`.
    #[must_use]
    pub fn dataset_path(&self, results_dir: &Path) -> PathBuf {
        match &self.dataset {
            Some(path) => path.clone(),
            None => results_dir.join(format!("{}.json", self.name.to_lowercase())),
        }
    }
}

fn default_repetitions() -> usize {
    1
}

/// A full study: engine parameters plus benchmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default)]
    pub engine: EngineParams,
    /// Fixed seed for every benchmark; when absent each benchmark seeds from
    /// its name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Independent passes averaged per benchmark.
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    #[serde(default = "StudyConfig::reference_benchmarks")]
    pub benchmarks: Vec<BenchmarkScenario>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl StudyConfig {
    /// The reference study: Memcached, Masstree, LSMTree and Phoenix.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            engine: EngineParams::default(),
            seed: None,
            repetitions: default_repetitions(),
            benchmarks: Self::reference_benchmarks(),
        }
    }

    /// Reference benchmark scenarios.
    #[must_use]
    pub fn reference_benchmarks() -> Vec<BenchmarkScenario> {
        vec![
            BenchmarkScenario::new("Memcached", WorkloadShape::new(1.2, 50_000, 4)),
            BenchmarkScenario::new("Masstree", WorkloadShape::new(1.2, 10_000, 4)),
            BenchmarkScenario::new("LSMTree", WorkloadShape::new(1.5, 4_000, 4)),
            BenchmarkScenario::new("Phoenix", WorkloadShape::new(1.2, 10_000, 8)),
        ]
    }

    /// Load a study from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load a study from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or validated.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Keep only the benchmarks whose names match `names` (case-insensitive).
    /// An empty filter keeps everything.
    #[must_use]
    pub fn retain_benchmarks(mut self, names: &[String]) -> Self {
        if !names.is_empty() {
            self.benchmarks
                .retain(|b| names.iter().any(|n| n.eq_ignore_ascii_case(&b.name)));
        }
        self
    }

    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter found.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.repetitions == 0 {
            return Err(SimError::invalid_parameter(
                "repetitions",
                "must be at least 1",
            ));
        }
        let mut seen = HashSet::new();
        for bench in &self.benchmarks {
            bench.workload.validate()?;
            if !seen.insert(bench.name.as_str()) {
                return Err(SimError::invalid_parameter(
                    "benchmarks",
                    format!("duplicate benchmark {:?}", bench.name),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let params = EngineParams::default();
        assert!((params.detection_probability - 0.02).abs() < f64::EPSILON);
        assert_eq!(params.window_capacity, 1000);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_engine_validation() {
        assert!(EngineParams::default()
            .with_detection_probability(1.5)
            .validate()
            .is_err());
        assert!(EngineParams::default()
            .with_window_capacity(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_reference_study() {
        let study = StudyConfig::reference();
        let names: Vec<&str> = study.benchmarks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Memcached", "Masstree", "LSMTree", "Phoenix"]);
        assert_eq!(study.benchmarks[3].workload, WorkloadShape::new(1.2, 10_000, 8));
        assert_eq!(study.benchmarks[2].workload, WorkloadShape::new(1.5, 4_000, 4));
        assert!(study.validate().is_ok());
    }

    #[test]
    fn test_default_dataset_path() {
        let bench = BenchmarkScenario::new("LSMTree", WorkloadShape::new(1.5, 4000, 4));
        assert_eq!(
            bench.dataset_path(Path::new(DEFAULT_RESULTS_DIR)),
            PathBuf::from("results/fault_injection/lsmtree.json")
        );
        let bench = bench.with_dataset("/data/lsm.json");
        assert_eq!(
            bench.dataset_path(Path::new(DEFAULT_RESULTS_DIR)),
            PathBuf::from("/data/lsm.json")
        );
    }

    #[test]
    fn test_parse_partial_config() {
        let study = StudyConfig::from_json_str(
            r#"{"seed": 7, "benchmarks": [{"name": "Tiny", "skew": 1.0, "trace_len": 100, "cores": 2}]}"#,
        )
        .unwrap();
        assert_eq!(study.seed, Some(7));
        assert_eq!(study.repetitions, 1);
        assert_eq!(study.engine, EngineParams::default());
        assert_eq!(study.benchmarks.len(), 1);
        assert_eq!(study.benchmarks[0].workload.cores, 2);
    }

    #[test]
    fn test_empty_config_is_reference() {
        let study = StudyConfig::from_json_str("{}").unwrap();
        assert_eq!(study, StudyConfig::reference());
    }

    #[test]
    fn test_rejects_duplicates_and_bad_skew() {
        let dup = r#"{"benchmarks": [
            {"name": "A", "skew": 1.0, "trace_len": 1, "cores": 1},
            {"name": "A", "skew": 1.0, "trace_len": 1, "cores": 1}
        ]}"#;
        assert!(StudyConfig::from_json_str(dup).is_err());
        let bad = r#"{"benchmarks": [{"name": "A", "skew": 0.0, "trace_len": 1, "cores": 1}]}"#;
        assert!(StudyConfig::from_json_str(bad).is_err());
        assert!(StudyConfig::from_json_str(r#"{"repetitions": 0}"#).is_err());
    }

    #[test]
    fn test_retain_benchmarks() {
        let study = StudyConfig::reference().retain_benchmarks(&["phoenix".to_string()]);
        assert_eq!(study.benchmarks.len(), 1);
        assert_eq!(study.benchmarks[0].name, "Phoenix");
        let all = StudyConfig::reference().retain_benchmarks(&[]);
        assert_eq!(all.benchmarks.len(), 4);
    }
}
