//! # SDC Sampling
//!
//! Monte-Carlo estimate of how many silent data corruptions a validator
//! catches when it can only check a fraction of executions.
//!
//! Recorded fault-injection outcomes are classified, folded into per-function
//! fault counts, and replayed against a synthetic Zipf-skewed execution
//! trace under two validation schedules:
//!
//! - **Random**: every execution is validated independently with the
//!   sampling rate
//! - **Orthrus**: executions are batched in a bounded window and a quota of
//!   `rate × fill` is validated on every drain
//!
//! Sampling rate is swept as `cores / ncpu`, producing one detection-rate
//! curve per policy.
//!
//! ## Example
//!
//! ```
//! use sdc_sampling::prelude::*;
//!
//! let profile = FaultProfile::new()
//!     .with_detectable("hash_insert", 3)
//!     .with_not_detectable("hash_lookup", 5);
//! let builder = CurveBuilder::new(&EngineParams::default())?;
//! let mut ctx = SimulationContext::new("example");
//! let curves = builder.build(&profile, &WorkloadShape::new(1.2, 1000, 4), ctx.rng())?;
//! assert_eq!(curves.xlim, 5);
//! # Ok::<(), sdc_sampling::SimError>(())
//! ```

pub mod classify;
pub mod config;
pub mod context;
pub mod curve;
pub mod dataset;
pub mod error;
pub mod policy;
pub mod study;
pub mod trace;

pub use error::{Result, SimError};

/// Re-exports for convenient access
pub mod prelude {
    pub use crate::classify::{ErrorKind, InjectionOutcome, InjectionSite};
    pub use crate::config::{BenchmarkScenario, EngineParams, StudyConfig, WorkloadShape};
    pub use crate::context::SimulationContext;
    pub use crate::curve::{Curve, CurveBuilder, DetectionCurves};
    pub use crate::dataset::{FaultDataset, FaultProfile, OutcomeCensus};
    pub use crate::error::{Result, SimError};
    pub use crate::policy::{RandomSampling, SamplingPolicy, WindowedSampling};
    pub use crate::study::{run_study, StudyResults};
    pub use crate::trace::ExecutionTrace;
}
