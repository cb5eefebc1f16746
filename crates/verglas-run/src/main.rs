//! verglas-run - Validates a scenario and prints the report as JSON.
//!
//! Loads a scenario description, runs the Monte Carlo engine against the
//! current calibration state and writes the judged report to stdout.
//! Exit code 0 means PASS or WARNING, 2 means FAIL, 1 means the run
//! itself could not complete.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verglas_engine::scenario::Scenario;
use verglas_engine::{Engine, EngineConfig, Verdict};

#[derive(Parser, Debug)]
#[command(name = "verglas-run")]
#[command(about = "Validate a brine spray scenario against reality-calibrated physics")]
struct Cli {
    /// Path to a scenario JSON file
    scenario: PathBuf,

    /// Number of Monte Carlo samples (defaults to the configured value)
    #[arg(long)]
    samples: Option<usize>,

    /// RNG seed; rerunning with the same seed reproduces the report
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Optional engine config JSON; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verglas_run=info,verglas_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config: {e}");
            return ExitCode::from(1);
        }
    };

    let scenario: Scenario = match fs::read_to_string(&cli.scenario)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(s) => s,
        Err(e) => {
            error!(path = %cli.scenario.display(), "failed to load scenario: {e}");
            return ExitCode::from(1);
        }
    };

    let samples = cli.samples.unwrap_or(config.monte_carlo.default_samples);

    let engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    info!(scenario = %scenario.id, samples, seed = cli.seed, "running validation");

    let report = match engine.simulate(&scenario, samples, cli.seed) {
        Ok(report) => report,
        Err(e) => {
            error!("simulation failed: {e}");
            return ExitCode::from(1);
        }
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("failed to render report: {e}");
            return ExitCode::from(1);
        }
    }

    match report.judgment.verdict {
        Verdict::Pass | Verdict::Warning => ExitCode::SUCCESS,
        Verdict::Fail => ExitCode::from(2),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}
