//! End-to-end study execution: dataset → profile → curves, per benchmark.

use crate::config::{BenchmarkScenario, EngineParams, StudyConfig};
use crate::context::SimulationContext;
use crate::curve::{CurveBuilder, DetectionCurves};
use crate::dataset::{FaultDataset, FaultProfile, OutcomeCensus};
use crate::error::Result;
use serde::{Serialize, Serializer};
use std::path::Path;
use std::time::Instant;

/// Simulation output for one benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub name: String,
    pub seed: u64,
    pub functions: usize,
    pub census: OutcomeCensus,
    pub curves: DetectionCurves,
}

/// Results of every benchmark in a study, in configuration order.
///
/// Serializes as an object mapping benchmark name to its curves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyResults {
    benchmarks: Vec<BenchmarkResult>,
}

impl StudyResults {
    /// Per-benchmark results.
    #[must_use]
    pub fn benchmarks(&self) -> &[BenchmarkResult] {
        &self.benchmarks
    }

    /// Look up one benchmark.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BenchmarkResult> {
        self.benchmarks.iter().find(|b| b.name == name)
    }
}

impl Serialize for StudyResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.benchmarks.iter().map(|b| (&b.name, &b.curves)))
    }
}

/// Simulate one benchmark from an already aggregated profile.
///
/// # Errors
///
/// Returns an error if the engine parameters are invalid or the profile has
/// no SDC outcomes.
pub fn simulate_profile(
    scenario: &BenchmarkScenario,
    profile: &FaultProfile,
    engine: &EngineParams,
    repetitions: usize,
    ctx: &mut SimulationContext,
) -> Result<BenchmarkResult> {
    let builder = CurveBuilder::new(engine)?;
    let started = Instant::now();
    let curves = builder.build_averaged(profile, &scenario.workload, repetitions, ctx.rng())?;
    let build_time = started.elapsed();
    tracing::debug!(
        benchmark = ctx.name(),
        repetitions,
        build_ms = build_time.as_secs_f64() * 1000.0,
        "detection curves built"
    );

    ctx.record_duration("simulate", build_time);

    ctx.record_metric("functions", profile.functions().len() as i64);
    ctx.record_metric("sdc_total", profile.total() as i64);
    ctx.record_metric("sdc_detectable", profile.total_detectable() as i64);
    if let Some(rate) = curves.random.last_rate() {
        ctx.record_float_metric("random_full_rate", rate);
    }
    if let Some(rate) = curves.orthrus.last_rate() {
        ctx.record_float_metric("orthrus_full_rate", rate);
    }

    Ok(BenchmarkResult {
        name: scenario.name.clone(),
        seed: ctx.seed(),
        functions: profile.functions().len(),
        census: *profile.census(),
        curves,
    })
}

/// Load, classify and simulate one benchmark.
///
/// # Errors
///
/// Returns an error if the dataset cannot be loaded or classified, or the
/// simulation fails.
pub fn run_benchmark(
    scenario: &BenchmarkScenario,
    config: &StudyConfig,
    results_dir: &Path,
) -> Result<BenchmarkResult> {
    let mut ctx = SimulationContext::seeded(&scenario.name, config.seed);
    let path = scenario.dataset_path(results_dir);
    ctx.record_string_metric("dataset", path.display().to_string());

    let profile = FaultDataset::from_path(&path)?.profile()?;
    let census = profile.census();
    tracing::info!(
        benchmark = %scenario.name,
        sdc_detected = census.sdc_detected,
        sdc_not_detected = census.sdc_not_detected,
        masked = census.masked,
        fail_stop = census.fail_stop,
        "classified injection outcomes"
    );

    let result = simulate_profile(
        scenario,
        &profile,
        &config.engine,
        config.repetitions,
        &mut ctx,
    )?;
    ctx.report();
    Ok(result)
}

/// Run every benchmark of a study.
///
/// # Errors
///
/// Returns the first benchmark error; no partial results are returned.
pub fn run_study(config: &StudyConfig, results_dir: &Path) -> Result<StudyResults> {
    config.validate()?;
    let benchmarks = config
        .benchmarks
        .iter()
        .map(|scenario| run_benchmark(scenario, config, results_dir))
        .collect::<Result<Vec<_>>>()?;
    Ok(StudyResults { benchmarks })
}
