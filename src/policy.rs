//! Validation-scheduling policies.
//!
//! Both policies walk the same [`ExecutionTrace`] and decide which executions
//! get validated. A validated execution of a function with detectable faults
//! catches each of those faults independently with the engine's detection
//! probability `P`. Caught faults go into a [`DetectionSet`], so re-detecting
//! a fault on a later execution does not raise the rate.
//!
//! - [`RandomSampling`] validates each execution independently with the
//!   sampling rate.
//! - [`WindowedSampling`] buffers executions in a bounded window and spends a
//!   validation budget of `rate × fill` every time the window drains.

use crate::config::EngineParams;
use crate::dataset::{FaultProfile, Pool};
use crate::error::{ensure_unit_interval, Result, SimError};
use crate::trace::ExecutionTrace;
use rand::Rng;
use std::collections::HashSet;

/// Distinct `(function, fault index)` pairs caught during one pass.
#[derive(Debug, Clone, Default)]
pub struct DetectionSet<'a> {
    hits: HashSet<(&'a str, usize)>,
}

impl<'a> DetectionSet<'a> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a caught fault. Returns `false` if it was already caught.
    pub fn insert(&mut self, function: &'a str, fault: usize) -> bool {
        self.hits.insert((function, fault))
    }

    /// Number of distinct faults caught.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether nothing was caught.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Result of one simulation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    /// Distinct faults caught.
    pub detected: usize,
    /// Detection-rate denominator of the profile.
    pub total: usize,
    /// Validation work performed. For [`RandomSampling`] this counts fault
    /// checks admitted by the sampling draw; for [`WindowedSampling`] it
    /// counts pending units drained.
    pub validations: usize,
}

impl PassOutcome {
    /// `detected / total`.
    #[must_use]
    pub fn detection_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.detected as f64 / self.total as f64
        }
    }
}

/// A validation-scheduling policy.
pub trait SamplingPolicy {
    /// Name used as the curve key in reports.
    fn name(&self) -> &'static str;

    /// Run one pass over `trace` at `sampling_rate`.
    ///
    /// # Errors
    ///
    /// Returns an error if `sampling_rate` is outside `[0, 1]`, the profile
    /// has no SDC outcomes, or the trace invokes a function that is in
    /// neither fault pool.
    fn simulate<R: Rng + ?Sized>(
        &self,
        profile: &FaultProfile,
        trace: &ExecutionTrace,
        sampling_rate: f64,
        rng: &mut R,
    ) -> Result<PassOutcome>;

    /// Run one pass and return only the detection rate.
    ///
    /// # Errors
    ///
    /// See [`SamplingPolicy::simulate`].
    fn detection_rate<R: Rng + ?Sized>(
        &self,
        profile: &FaultProfile,
        trace: &ExecutionTrace,
        sampling_rate: f64,
        rng: &mut R,
    ) -> Result<f64> {
        self.simulate(profile, trace, sampling_rate, rng)
            .map(|outcome| outcome.detection_rate())
    }
}

/// Pool of each ranked function in `trace`.
fn rank_pools(profile: &FaultProfile, trace: &ExecutionTrace) -> Vec<Pool> {
    trace.ranking().iter().map(|f| profile.pool(f)).collect()
}

fn check_pass_inputs(profile: &FaultProfile, sampling_rate: f64) -> Result<usize> {
    ensure_unit_interval("sampling_rate", sampling_rate)?;
    match profile.total() {
        0 => Err(SimError::no_data("profile has no SDC outcomes")),
        total => Ok(total),
    }
}

/// Uniform random sampling: each execution is validated independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomSampling {
    detection_probability: f64,
}

impl RandomSampling {
    /// Policy name used in curve output.
    pub const NAME: &'static str = "Random";

    /// Create the policy with detection probability `P`.
    ///
    /// # Errors
    ///
    /// Returns an error if `detection_probability` is outside `[0, 1]`.
    pub fn new(detection_probability: f64) -> Result<Self> {
        ensure_unit_interval("detection_probability", detection_probability)?;
        Ok(Self {
            detection_probability,
        })
    }

    /// Create the policy from engine parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range.
    pub fn from_params(params: &EngineParams) -> Result<Self> {
        Self::new(params.detection_probability)
    }
}

impl SamplingPolicy for RandomSampling {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn simulate<R: Rng + ?Sized>(
        &self,
        profile: &FaultProfile,
        trace: &ExecutionTrace,
        sampling_rate: f64,
        rng: &mut R,
    ) -> Result<PassOutcome> {
        let total = check_pass_inputs(profile, sampling_rate)?;
        let pools = rank_pools(profile, trace);
        let mut detected = DetectionSet::new();
        let mut validations = 0;

        for &rank in trace.invocations() {
            let function = trace.ranking()[rank].as_str();
            let faults = match pools[rank] {
                Pool::Detectable(count) => count,
                Pool::NotDetectable => continue,
                Pool::Missing => return Err(SimError::unpooled(function)),
            };
            for fault in 0..faults {
                if rng.gen::<f64>() < sampling_rate {
                    validations += 1;
                    if rng.gen::<f64>() < self.detection_probability {
                        detected.insert(function, fault);
                    }
                }
            }
        }

        let outcome = PassOutcome {
            detected: detected.len(),
            total,
            validations,
        };
        tracing::debug!(
            policy = Self::NAME,
            sampling_rate,
            detected = outcome.detected,
            validations,
            "random sampling pass complete"
        );
        Ok(outcome)
    }
}

/// Bounded buffer of pending executions, counted per ranked function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWindow {
    capacity: usize,
    pending: Vec<usize>,
    fill: usize,
}

impl ValidationWindow {
    /// Create an empty window over `functions` ranked functions.
    #[must_use]
    pub fn new(capacity: usize, functions: usize) -> Self {
        Self {
            capacity,
            pending: vec![0; functions],
            fill: 0,
        }
    }

    /// Maximum number of pending executions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pending executions.
    #[must_use]
    pub fn fill(&self) -> usize {
        self.fill
    }

    /// Pending executions per ranked function.
    #[must_use]
    pub fn pending(&self) -> &[usize] {
        &self.pending
    }

    /// Whether the window has reached capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.fill >= self.capacity
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    /// Buffer one execution of `rank`. Returns `false` if the window is full.
    ///
    /// # Errors
    ///
    /// Returns an error if `rank` is not a function of this window.
    pub fn admit(&mut self, rank: usize) -> Result<bool> {
        let functions = self.pending.len();
        let Some(slot) = self.pending.get_mut(rank) else {
            return Err(SimError::invalid_parameter(
                "rank",
                format!("{rank} is outside a window of {functions} functions"),
            ));
        };
        if self.fill >= self.capacity {
            return Ok(false);
        }
        *slot += 1;
        self.fill += 1;
        Ok(true)
    }

    /// Drain the window, validating up to `sampling_rate × fill` units.
    ///
    /// Each scan over the ranked functions takes one pending unit from every
    /// function that still has one and hands its rank to `validate`. Draining
    /// stops as soon as the number of validated units reaches the budget, so
    /// a fractional budget rounds up: exactly
    /// `min(ceil(sampling_rate × fill), fill)` units are validated. Whatever
    /// remains is discarded and the window is left empty.
    ///
    /// Returns the number of units validated.
    pub fn flush<F: FnMut(usize)>(&mut self, sampling_rate: f64, mut validate: F) -> usize {
        let budget = sampling_rate * self.fill as f64;
        let mut validated = 0usize;

        'drain: while (validated as f64) < budget {
            let mut drained_any = false;
            for (rank, pending) in self.pending.iter_mut().enumerate() {
                if *pending == 0 {
                    continue;
                }
                *pending -= 1;
                drained_any = true;
                validate(rank);
                validated += 1;
                if validated as f64 >= budget {
                    break 'drain;
                }
            }
            if !drained_any {
                break;
            }
        }

        self.pending.iter_mut().for_each(|p| *p = 0);
        self.fill = 0;
        validated
    }
}

/// Windowed batching validator.
///
/// Executions accumulate in a [`ValidationWindow`]. An execution arriving at
/// a full window triggers a flush and is itself dropped. A final flush runs
/// after the trace ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowedSampling {
    detection_probability: f64,
    window_capacity: usize,
}

impl WindowedSampling {
    /// Policy name used in curve output.
    pub const NAME: &'static str = "Orthrus";

    /// Create the policy with detection probability `P` and window capacity `W`.
    ///
    /// # Errors
    ///
    /// Returns an error if `detection_probability` is outside `[0, 1]` or
    /// `window_capacity` is zero.
    pub fn new(detection_probability: f64, window_capacity: usize) -> Result<Self> {
        ensure_unit_interval("detection_probability", detection_probability)?;
        if window_capacity == 0 {
            return Err(SimError::invalid_parameter(
                "window_capacity",
                "must be at least 1",
            ));
        }
        Ok(Self {
            detection_probability,
            window_capacity,
        })
    }

    /// Create the policy from engine parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range.
    pub fn from_params(params: &EngineParams) -> Result<Self> {
        Self::new(params.detection_probability, params.window_capacity)
    }

    /// Window capacity `W`.
    #[must_use]
    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }
}

impl SamplingPolicy for WindowedSampling {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn simulate<R: Rng + ?Sized>(
        &self,
        profile: &FaultProfile,
        trace: &ExecutionTrace,
        sampling_rate: f64,
        rng: &mut R,
    ) -> Result<PassOutcome> {
        let total = check_pass_inputs(profile, sampling_rate)?;
        let pools = rank_pools(profile, trace);
        let ranking = trace.ranking();
        let p = self.detection_probability;

        let mut detected = DetectionSet::new();
        let mut window = ValidationWindow::new(self.window_capacity, ranking.len());
        let mut flushes = 0usize;
        let mut validations = 0usize;

        let mut validate = |rank: usize| {
            if let Pool::Detectable(faults) = pools[rank] {
                for fault in 0..faults {
                    if rng.gen::<f64>() < p {
                        detected.insert(ranking[rank].as_str(), fault);
                    }
                }
            }
        };

        for &rank in trace.invocations() {
            if pools[rank] == Pool::Missing {
                return Err(SimError::unpooled(ranking[rank].as_str()));
            }
            if !window.admit(rank)? {
                validations += window.flush(sampling_rate, &mut validate);
                flushes += 1;
            }
        }
        validations += window.flush(sampling_rate, &mut validate);
        flushes += 1;

        let outcome = PassOutcome {
            detected: detected.len(),
            total,
            validations,
        };
        tracing::debug!(
            policy = Self::NAME,
            sampling_rate,
            detected = outcome.detected,
            validations,
            flushes,
            "windowed sampling pass complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_function_profile() -> FaultProfile {
        FaultProfile::new()
            .with_detectable("f1", 3)
            .with_not_detectable("f2", 5)
    }

    fn fixed_trace(pattern: &[usize]) -> ExecutionTrace {
        ExecutionTrace::from_parts(vec!["f1".into(), "f2".into()], pattern.to_vec()).unwrap()
    }

    #[test]
    fn test_random_certain_detection() {
        let policy = RandomSampling::new(1.0).unwrap();
        let trace = fixed_trace(&[1, 0, 1, 0, 0]);
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = policy.simulate(&two_function_profile(), &trace, 1.0, &mut rng).unwrap();
        assert_eq!(outcome.detected, 3);
        assert_eq!(outcome.total, 8);
        assert_eq!(outcome.validations, 9);
        assert!((outcome.detection_rate() - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_random_zero_rate_detects_nothing() {
        let policy = RandomSampling::new(1.0).unwrap();
        let trace = fixed_trace(&[0; 50]);
        let mut rng = StdRng::seed_from_u64(1);
        let rate = policy
            .detection_rate(&two_function_profile(), &trace, 0.0, &mut rng)
            .unwrap();
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn test_random_unpooled_function_is_fatal() {
        let trace =
            ExecutionTrace::from_parts(vec!["f1".into(), "ghost".into()], vec![0, 1]).unwrap();
        let policy = RandomSampling::new(0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = policy
            .simulate(&two_function_profile(), &trace, 0.5, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SimError::UnpooledFunction { ref function } if function == "ghost"));
    }

    #[test]
    fn test_rate_out_of_range() {
        let trace = fixed_trace(&[0]);
        let mut rng = StdRng::seed_from_u64(1);
        let random = RandomSampling::new(0.5).unwrap();
        let windowed = WindowedSampling::new(0.5, 10).unwrap();
        assert!(random.simulate(&two_function_profile(), &trace, 1.5, &mut rng).is_err());
        assert!(windowed.simulate(&two_function_profile(), &trace, -0.1, &mut rng).is_err());
    }

    #[test]
    fn test_empty_profile_is_no_data() {
        let trace = ExecutionTrace::from_parts(Vec::new(), Vec::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let policy = RandomSampling::new(0.5).unwrap();
        assert!(matches!(
            policy.simulate(&FaultProfile::new(), &trace, 0.5, &mut rng),
            Err(SimError::NoData { .. })
        ));
    }

    #[test]
    fn test_invalid_policy_parameters() {
        assert!(RandomSampling::new(1.2).is_err());
        assert!(WindowedSampling::new(0.5, 0).is_err());
        assert!(WindowedSampling::new(f64::NAN, 10).is_err());
    }

    #[test]
    fn test_window_admits_up_to_capacity() {
        let mut window = ValidationWindow::new(3, 2);
        assert!(window.admit(0).unwrap());
        assert!(window.admit(1).unwrap());
        assert!(window.admit(0).unwrap());
        assert!(window.is_full());
        assert!(!window.admit(1).unwrap());
        assert_eq!(window.pending(), &[2, 1]);
        assert_eq!(window.fill(), 3);
    }

    #[test]
    fn test_admit_unknown_rank_is_rejected() {
        let mut window = ValidationWindow::new(4, 2);
        assert!(matches!(
            window.admit(5),
            Err(SimError::InvalidParameter { .. })
        ));
        assert!(window.admit(2).is_err());
        assert!(window.is_empty());
        assert_eq!(window.pending(), &[0, 0]);

        // Still rejected once full, rather than reported as a full window.
        let mut full = ValidationWindow::new(1, 1);
        assert!(full.admit(0).unwrap());
        assert!(full.admit(1).is_err());
    }

    #[test]
    fn test_flush_resets_window() {
        let mut window = ValidationWindow::new(10, 3);
        for rank in [0, 1, 2, 0, 0] {
            window.admit(rank).unwrap();
        }
        window.flush(0.2, |_| {});
        assert!(window.is_empty());
        assert!(window.pending().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_flush_fractional_budget_rounds_up() {
        let mut window = ValidationWindow::new(10, 3);
        for rank in [0, 1, 2] {
            window.admit(rank).unwrap();
        }
        // budget 1.5 -> two units
        assert_eq!(window.flush(0.5, |_| {}), 2);
    }

    #[test]
    fn test_flush_scans_round_robin() {
        let mut window = ValidationWindow::new(10, 3);
        for rank in [0, 0, 0, 1, 2] {
            window.admit(rank).unwrap();
        }
        let mut order = Vec::new();
        let validated = window.flush(1.0, |rank| order.push(rank));
        assert_eq!(validated, 5);
        assert_eq!(order, vec![0, 1, 2, 0, 0]);
    }

    #[test]
    fn test_flush_zero_rate_validates_nothing() {
        let mut window = ValidationWindow::new(10, 1);
        window.admit(0).unwrap();
        let mut calls = 0;
        assert_eq!(window.flush(0.0, |_| calls += 1), 0);
        assert_eq!(calls, 0);
        assert!(window.is_empty());
    }

    #[test]
    fn test_flush_empty_window() {
        let mut window = ValidationWindow::new(4, 2);
        assert_eq!(window.flush(1.0, |_| {}), 0);
    }

    #[test]
    fn test_windowed_certain_detection_large_window() {
        let policy = WindowedSampling::new(1.0, 100).unwrap();
        let trace = fixed_trace(&[1, 1, 0, 1]);
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = policy.simulate(&two_function_profile(), &trace, 1.0, &mut rng).unwrap();
        assert_eq!(outcome.detected, 3);
        assert_eq!(outcome.validations, 4);
    }

    #[test]
    fn test_windowed_drops_invocation_that_triggers_flush() {
        // Capacity 2: [f2, f2] fills, the f1 arrival flushes and is dropped,
        // and the final flush sees an empty window.
        let policy = WindowedSampling::new(1.0, 2).unwrap();
        let trace = fixed_trace(&[1, 1, 0]);
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = policy.simulate(&two_function_profile(), &trace, 1.0, &mut rng).unwrap();
        assert_eq!(outcome.detected, 0);
        assert_eq!(outcome.validations, 2);
    }

    #[test]
    fn test_windowed_unpooled_function_is_fatal() {
        let trace =
            ExecutionTrace::from_parts(vec!["f1".into(), "ghost".into()], vec![0, 1]).unwrap();
        let policy = WindowedSampling::new(0.5, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            policy.simulate(&two_function_profile(), &trace, 0.5, &mut rng),
            Err(SimError::UnpooledFunction { .. })
        ));
    }

    #[test]
    fn test_detection_set_is_a_set() {
        let mut set = DetectionSet::new();
        assert!(set.insert("f", 0));
        assert!(!set.insert("f", 0));
        assert!(set.insert("f", 1));
        assert_eq!(set.len(), 2);
        assert!(set.insert("g", 1));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(RandomSampling::new(0.02).unwrap().name(), "Random");
        assert_eq!(WindowedSampling::new(0.02, 1000).unwrap().name(), "Orthrus");
    }
}
