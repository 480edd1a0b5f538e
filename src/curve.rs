//! Detection-rate curves over simulated core counts.
//!
//! For a benchmark with `ncpu` cores, core count `x` validates a fraction
//! `x / ncpu` of executions. The builder synthesizes one trace and evaluates
//! both policies at every core count on that same trace, so the two curves
//! are directly comparable point by point.
//!
//! Curves serialize in the shape downstream plotting expects:
//!
//! ```json
//! { "Random": [[1, 2, 3, 4], [0.1, 0.2, 0.3, 0.4]],
//!   "Orthrus": [[1, 2, 3, 4], [0.1, 0.2, 0.3, 0.4]],
//!   "xlim": 5 }
//! ```

use crate::config::{EngineParams, WorkloadShape};
use crate::dataset::FaultProfile;
use crate::error::{Result, SimError};
use crate::policy::{RandomSampling, SamplingPolicy, WindowedSampling};
use crate::trace::{self, ExecutionTrace};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Detection rate as a function of core count, for one policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    cores: Vec<usize>,
    rates: Vec<f64>,
}

impl Curve {
    /// Create an empty curve.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point.
    pub fn push(&mut self, cores: usize, rate: f64) {
        self.cores.push(cores);
        self.rates.push(rate);
    }

    /// Core counts, ascending.
    #[must_use]
    pub fn cores(&self) -> &[usize] {
        &self.cores
    }

    /// Detection rates, aligned with [`Curve::cores`].
    #[must_use]
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// `(cores, rate)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.cores.iter().copied().zip(self.rates.iter().copied())
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Whether the curve has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Rate at the highest core count.
    #[must_use]
    pub fn last_rate(&self) -> Option<f64> {
        self.rates.last().copied()
    }
}

impl Serialize for Curve {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (&self.cores, &self.rates).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Curve {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (cores, rates) = <(Vec<usize>, Vec<f64>)>::deserialize(deserializer)?;
        if cores.len() != rates.len() {
            return Err(serde::de::Error::custom(format!(
                "curve has {} core counts but {} rates",
                cores.len(),
                rates.len()
            )));
        }
        Ok(Self { cores, rates })
    }
}

/// Both policy curves for one benchmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionCurves {
    #[serde(rename = "Random")]
    pub random: Curve,
    #[serde(rename = "Orthrus")]
    pub orthrus: Curve,
    /// Display bound for the core axis, `ncpu + 1`.
    pub xlim: usize,
}

impl DetectionCurves {
    /// Curves keyed by policy name.
    #[must_use]
    pub fn by_policy(&self) -> [(&'static str, &Curve); 2] {
        [
            (RandomSampling::NAME, &self.random),
            (WindowedSampling::NAME, &self.orthrus),
        ]
    }

    fn empty(cores: usize) -> Self {
        Self {
            random: Curve::new(),
            orthrus: Curve::new(),
            xlim: cores + 1,
        }
    }
}

/// Sweeps sampling rate over core counts for both policies.
#[derive(Debug, Clone, Copy)]
pub struct CurveBuilder {
    random: RandomSampling,
    windowed: WindowedSampling,
}

impl CurveBuilder {
    /// Create a builder from engine parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range.
    pub fn new(params: &EngineParams) -> Result<Self> {
        Ok(Self {
            random: RandomSampling::from_params(params)?,
            windowed: WindowedSampling::from_params(params)?,
        })
    }

    /// Synthesize one trace and evaluate both policies at `x / ncpu` for
    /// `x = 1..=ncpu`.
    ///
    /// With zero cores the result has empty curves and `xlim = 1`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoData`] if the profile has no SDC outcomes, or an
    /// error from trace synthesis or the policies.
    pub fn build<R: Rng + ?Sized>(
        &self,
        profile: &FaultProfile,
        workload: &WorkloadShape,
        rng: &mut R,
    ) -> Result<DetectionCurves> {
        workload.validate()?;
        if profile.total() == 0 {
            return Err(SimError::no_data("profile has no SDC outcomes"));
        }
        if workload.cores == 0 {
            return Ok(DetectionCurves::empty(0));
        }

        let trace = trace::synthesize(&profile.functions(), workload.skew, workload.trace_len, rng)?;
        self.build_on_trace(profile, &trace, workload.cores, rng)
    }

    /// Evaluate both policies on an existing trace.
    ///
    /// # Errors
    ///
    /// Returns an error from either policy.
    pub fn build_on_trace<R: Rng + ?Sized>(
        &self,
        profile: &FaultProfile,
        trace: &ExecutionTrace,
        cores: usize,
        rng: &mut R,
    ) -> Result<DetectionCurves> {
        let mut curves = DetectionCurves::empty(cores);
        curves.random = sweep(&self.random, profile, trace, cores, rng)?;
        curves.orthrus = sweep(&self.windowed, profile, trace, cores, rng)?;
        Ok(curves)
    }

    /// Average `repetitions` independent builds point by point. Every
    /// repetition draws a fresh trace.
    ///
    /// # Errors
    ///
    /// Returns an error if `repetitions` is zero or any build fails.
    pub fn build_averaged<R: Rng + ?Sized>(
        &self,
        profile: &FaultProfile,
        workload: &WorkloadShape,
        repetitions: usize,
        rng: &mut R,
    ) -> Result<DetectionCurves> {
        if repetitions == 0 {
            return Err(SimError::invalid_parameter(
                "repetitions",
                "must be at least 1",
            ));
        }

        let mut sum = self.build(profile, workload, rng)?;
        for _ in 1..repetitions {
            let next = self.build(profile, workload, rng)?;
            accumulate(&mut sum.random, &next.random);
            accumulate(&mut sum.orthrus, &next.orthrus);
        }
        let k = repetitions as f64;
        for rate in sum.random.rates.iter_mut().chain(sum.orthrus.rates.iter_mut()) {
            *rate /= k;
        }
        Ok(sum)
    }
}

/// One policy's rate at every core count, in increasing order.
fn sweep<P: SamplingPolicy, R: Rng + ?Sized>(
    policy: &P,
    profile: &FaultProfile,
    trace: &ExecutionTrace,
    cores: usize,
    rng: &mut R,
) -> Result<Curve> {
    let mut curve = Curve::new();
    for x in 1..=cores {
        let rate = x as f64 / cores as f64;
        curve.push(x, policy.detection_rate(profile, trace, rate, rng)?);
    }
    tracing::debug!(
        policy = policy.name(),
        cores,
        full_rate = ?curve.last_rate(),
        "policy sweep complete"
    );
    Ok(curve)
}

fn accumulate(sum: &mut Curve, next: &Curve) {
    for (acc, rate) in sum.rates.iter_mut().zip(&next.rates) {
        *acc += rate;
    }
}
