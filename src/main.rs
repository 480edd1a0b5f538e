//! Detection-rate study runner.
//!
//! Simulates Random and Orthrus validation for each configured benchmark and
//! writes the curves as JSON.
//!
//! # Run
//!
//! ```bash
//! cargo run --release -- --results-dir results/fault_injection
//! cargo run --release -- --bench memcached --seed 42 --output detection-rate.json
//! ```

use clap::Parser;
use sdc_sampling::config::{StudyConfig, DEFAULT_RESULTS_DIR};
use sdc_sampling::study::{run_study, StudyResults};
use sdc_sampling::Result;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sdc-sampling")]
#[command(about = "Estimate SDC detection rate under sampled validation")]
#[command(version)]
struct Args {
    /// Study configuration (JSON); the reference study is used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding `<benchmark>.json` fault-injection datasets
    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Only simulate these benchmarks (repeatable, case-insensitive)
    #[arg(short, long = "bench", value_name = "NAME")]
    benches: Vec<String>,

    /// Seed every benchmark with this value instead of its name hash
    #[arg(short, long)]
    seed: Option<u64>,

    /// Independent passes averaged per benchmark
    #[arg(short, long)]
    repetitions: Option<usize>,

    /// Per-validation detection probability
    #[arg(long)]
    detection_probability: Option<f64>,

    /// Windowed validator capacity
    #[arg(long)]
    window_capacity: Option<usize>,

    /// Write curves to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn study(&self) -> Result<StudyConfig> {
        let mut study = match &self.config {
            Some(path) => StudyConfig::from_path(path)?,
            None => StudyConfig::reference(),
        };
        if let Some(seed) = self.seed {
            study.seed = Some(seed);
        }
        if let Some(repetitions) = self.repetitions {
            study.repetitions = repetitions;
        }
        if let Some(p) = self.detection_probability {
            study.engine.detection_probability = p;
        }
        if let Some(w) = self.window_capacity {
            study.engine.window_capacity = w;
        }
        let study = study.retain_benchmarks(&self.benches);
        study.validate()?;
        Ok(study)
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(results: &StudyResults) {
    for bench in results.benchmarks() {
        eprintln!("=== {} (seed {}) ===", bench.name, bench.seed);
        let [(random_name, random_curve), (orthrus_name, orthrus_curve)] =
            bench.curves.by_policy();
        eprintln!("{:>6} {:>10} {:>10}", "cores", random_name, orthrus_name);
        for ((cores, random), (_, orthrus)) in random_curve.points().zip(orthrus_curve.points()) {
            eprintln!("{:>6} {:>9.2}% {:>9.2}%", cores, random * 100.0, orthrus * 100.0);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let study = args.study()?;
    if study.benchmarks.is_empty() {
        tracing::warn!(filter = ?args.benches, "no benchmark matched the filter");
    }

    let results = run_study(&study, &args.results_dir)?;
    print_summary(&results);

    let json = serde_json::to_string_pretty(&results)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "wrote detection-rate curves");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }

    Ok(())
}
