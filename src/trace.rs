//! Synthetic execution traces with Zipf-skewed function popularity.
//!
//! A few hot functions dominate real workloads. The synthesizer models this
//! by ranking the observed functions in a random order and drawing
//! invocations with probability proportional to `1 / rank^a`.

use crate::error::{Result, SimError};
use rand::seq::SliceRandom;
use rand::Rng;

/// Ordered sequence of function invocations.
///
/// Invocations are stored as indices into the popularity ranking, which is
/// also the order in which the windowed policy scans pending functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTrace {
    ranking: Vec<String>,
    invocations: Vec<usize>,
}

impl ExecutionTrace {
    /// Build a trace from an explicit ranking and rank indices.
    ///
    /// # Errors
    ///
    /// Returns an error if any invocation index is outside the ranking.
    pub fn from_parts(ranking: Vec<String>, invocations: Vec<usize>) -> Result<Self> {
        if let Some(bad) = invocations.iter().find(|&&i| i >= ranking.len()) {
            return Err(SimError::invalid_parameter(
                "invocations",
                format!("index {bad} outside ranking of {}", ranking.len()),
            ));
        }
        Ok(Self {
            ranking,
            invocations,
        })
    }

    /// Functions in rank order (most popular first).
    #[must_use]
    pub fn ranking(&self) -> &[String] {
        &self.ranking
    }

    /// Rank indices of each invocation, in execution order.
    #[must_use]
    pub fn invocations(&self) -> &[usize] {
        &self.invocations
    }

    /// Function names in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.invocations.iter().map(|&i| self.ranking[i].as_str())
    }

    /// Number of invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    /// Whether the trace has no invocations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

/// Normalized Zipf weights `1 / r^a` for ranks `1..=m`.
#[must_use]
pub fn zipf_weights(m: usize, skew: f64) -> Vec<f64> {
    let mut weights: Vec<f64> = (1..=m).map(|r| 1.0 / (r as f64).powf(skew)).collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Draw a trace of `len` invocations over `functions`.
///
/// The functions are sorted, then shuffled with `rng` to assign ranks, so the
/// hot set differs from call to call but is reproducible for a given seed.
///
/// # Errors
///
/// Returns an error if `skew` is not a positive finite number, or if
/// `functions` is empty while `len > 0`.
pub fn synthesize<R, S>(functions: &[S], skew: f64, len: usize, rng: &mut R) -> Result<ExecutionTrace>
where
    R: Rng + ?Sized,
    S: AsRef<str>,
{
    if !(skew.is_finite() && skew > 0.0) {
        return Err(SimError::invalid_parameter(
            "skew",
            format!("must be a positive finite number, got {skew}"),
        ));
    }

    let mut ranking: Vec<String> = functions.iter().map(|f| f.as_ref().to_string()).collect();
    ranking.sort();
    ranking.dedup();

    if len == 0 {
        return Ok(ExecutionTrace {
            ranking,
            invocations: Vec::new(),
        });
    }
    if ranking.is_empty() {
        return Err(SimError::no_data("cannot synthesize a trace without functions"));
    }

    ranking.shuffle(rng);

    let mut cdf = Vec::with_capacity(ranking.len());
    let mut cumsum = 0.0;
    for w in zipf_weights(ranking.len(), skew) {
        cumsum += w;
        cdf.push(cumsum);
    }

    let last = ranking.len() - 1;
    let invocations = (0..len)
        .map(|_| {
            let r: f64 = rng.gen();
            cdf.partition_point(|&c| c < r).min(last)
        })
        .collect();

    Ok(ExecutionTrace {
        ranking,
        invocations,
    })
}
