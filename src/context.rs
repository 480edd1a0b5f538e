//! Per-benchmark simulation context.
//!
//! Every benchmark runs with its own [`SimulationContext`], which owns the
//! only random number generator the run draws from. The generator is seeded
//! either explicitly or from a BLAKE3 hash of the benchmark name, so:
//!
//! - **Reproducible**: the same name (or seed) yields the same curves
//! - **Isolated**: benchmarks never share generator state
//! - **Reported**: timing and metrics are emitted as one structured event

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Context for one benchmark's simulation.
///
/// # Example
///
/// ```
/// use sdc_sampling::context::SimulationContext;
/// use rand::Rng;
///
/// let mut ctx = SimulationContext::new("Memcached");
/// let draw: f64 = ctx.rng().gen();
/// assert!((0.0..1.0).contains(&draw));
/// ctx.record_metric("trace_len", 50_000);
/// ctx.report();
/// ```
#[derive(Debug)]
pub struct SimulationContext {
    /// Benchmark name for identification and seed derivation
    name: String,
    /// Seed the generator was created from
    seed: u64,
    /// Deterministic generator threaded through every stochastic step
    rng: StdRng,
    /// Start time for duration tracking
    start_time: Instant,
    /// Collected metrics for reporting
    metrics: BTreeMap<String, MetricValue>,
}

/// A metric value that can be recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Integer metric (e.g., outcome count)
    Int(i64),
    /// Float metric (e.g., detection rate)
    Float(f64),
    /// Duration metric
    Duration(Duration),
    /// String metric
    String(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.4}"),
            Self::Duration(d) => write!(f, "{:.2}ms", d.as_secs_f64() * 1000.0),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl SimulationContext {
    /// Create a context seeded from the benchmark name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_seed(name, hash_name_to_seed(name))
    }

    /// Create a context with an explicit seed.
    #[must_use]
    pub fn with_seed(name: &str, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            start_time: Instant::now(),
            metrics: BTreeMap::new(),
        }
    }

    /// Create a context, using `seed` when given and the name hash otherwise.
    #[must_use]
    pub fn seeded(name: &str, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(name, seed),
            None => Self::new(name),
        }
    }

    /// Mutable access to the deterministic generator.
    #[must_use]
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Benchmark name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seed the generator was created from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Elapsed time since context creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Record an integer metric.
    pub fn record_metric(&mut self, name: &str, value: i64) {
        self.metrics
            .insert(name.to_string(), MetricValue::Int(value));
    }

    /// Record a float metric.
    pub fn record_float_metric(&mut self, name: &str, value: f64) {
        self.metrics
            .insert(name.to_string(), MetricValue::Float(value));
    }

    /// Record a duration metric.
    pub fn record_duration(&mut self, name: &str, duration: Duration) {
        self.metrics
            .insert(name.to_string(), MetricValue::Duration(duration));
    }

    /// Record a string metric.
    pub fn record_string_metric(&mut self, name: &str, value: impl Into<String>) {
        self.metrics
            .insert(name.to_string(), MetricValue::String(value.into()));
    }

    /// Emit elapsed time and all metrics as a single `info` event.
    pub fn report(&self) {
        tracing::info!(
            benchmark = %self.name,
            seed = self.seed,
            elapsed_ms = self.elapsed().as_secs_f64() * 1000.0,
            metrics = %self.summary(),
            "benchmark simulated"
        );
    }

    /// Metrics as space-separated `name=value` pairs, sorted by name.
    pub(crate) fn summary(&self) -> String {
        self.metrics
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Hash a benchmark name to a deterministic u64 seed.
///
/// Uses BLAKE3 for consistent cross-platform hashing.
#[must_use]
pub fn hash_name_to_seed(name: &str) -> u64 {
    let hash = blake3::hash(name.as_bytes());
    let bytes = hash.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_context_creation() {
        let ctx = SimulationContext::new("Masstree");
        assert_eq!(ctx.name(), "Masstree");
        assert_eq!(ctx.seed(), hash_name_to_seed("Masstree"));
    }

    #[test]
    fn test_same_name_same_sequence() {
        let mut ctx1 = SimulationContext::new("Phoenix");
        let mut ctx2 = SimulationContext::new("Phoenix");

        let seq1: Vec<u64> = (0..10).map(|_| ctx1.rng().gen()).collect();
        let seq2: Vec<u64> = (0..10).map(|_| ctx2.rng().gen()).collect();

        assert_eq!(seq1, seq2);
    }

    #[test]
    fn test_different_names_different_sequence() {
        let mut ctx1 = SimulationContext::new("Memcached");
        let mut ctx2 = SimulationContext::new("LSMTree");

        let val1: u64 = ctx1.rng().gen();
        let val2: u64 = ctx2.rng().gen();

        assert_ne!(val1, val2);
    }

    #[test]
    fn test_explicit_seed_overrides_name() {
        let mut a = SimulationContext::seeded("Memcached", Some(42));
        let mut b = SimulationContext::seeded("Phoenix", Some(42));
        assert_eq!(a.seed(), 42);
        assert_eq!(a.rng().gen::<u64>(), b.rng().gen::<u64>());

        let c = SimulationContext::seeded("Phoenix", None);
        assert_eq!(c.seed(), hash_name_to_seed("Phoenix"));
    }

    #[test]
    fn test_metrics_recording() {
        let mut ctx = SimulationContext::new("metrics");

        ctx.record_metric("functions", 12);
        ctx.record_float_metric("orthrus_rate", 0.4321);
        ctx.record_duration("simulate", Duration::from_millis(42));
        ctx.record_string_metric("dataset", "memcached.json");

        assert_eq!(
            ctx.summary(),
            "dataset=memcached.json functions=12 orthrus_rate=0.4321 simulate=42.00ms"
        );
        ctx.report();
    }

    #[test]
    fn test_metric_overwrites_previous_value() {
        let mut ctx = SimulationContext::new("metrics");
        ctx.record_metric("functions", 1);
        ctx.record_metric("functions", 2);
        assert_eq!(ctx.summary(), "functions=2");
    }

    #[test]
    fn test_hash_name_to_seed() {
        assert_eq!(hash_name_to_seed("a"), hash_name_to_seed("a"));
        assert_ne!(hash_name_to_seed("a"), hash_name_to_seed("b"));
    }
}
