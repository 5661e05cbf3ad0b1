//! Investment clock backtest CLI.
//!
//! # Run the backtest and write outputs
//! clock-backtest run --config config/default.toml --data data --output outputs
//!
//! # Print the regime of the latest period
//! clock-backtest current --data data
//!
//! # Check the input tables
//! clock-backtest validate --data data

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clock_backtest::{BacktestConfig, BacktestEngine, DataIntegrityValidator};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "clock-backtest")]
#[command(about = "Investment clock regime backtester")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to data directory
    #[arg(short, long, global = true, default_value = "data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full backtest and write results
    Run {
        /// Output directory for results
        #[arg(short, long, default_value = "outputs")]
        output: PathBuf,
    },

    /// Show the regime of the most recent period
    Current,

    /// Validate the indicator and sector tables
    Validate,
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("clock_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { output } => cmd_run(config, &cli.data, &output),
        Commands::Current => cmd_current(config, &cli.data),
        Commands::Validate => cmd_validate(config, &cli.data),
    }
}

fn cmd_run(config: BacktestConfig, data: &Path, output: &Path) -> Result<()> {
    let engine = BacktestEngine::new(config);
    let report = engine
        .run_from_dir(data)
        .with_context(|| format!("Backtest failed for data in {}", data.display()))?;

    let paths = report
        .write(output)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;

    println!("{}", SEPARATOR);
    print!("{}", report.summary());
    println!("{}", SEPARATOR);
    println!("Results: {}", paths.results.display());
    println!("History: {}", paths.history.display());
    Ok(())
}

fn cmd_current(config: BacktestConfig, data: &Path) -> Result<()> {
    let engine = BacktestEngine::new(config);
    let report = engine
        .run_from_dir(data)
        .with_context(|| format!("Backtest failed for data in {}", data.display()))?;

    let Some(current) = report.current_regime else {
        bail!("Current regime is undefined: not enough history for the rolling window");
    };

    println!("{}", SEPARATOR);
    println!("Current regime as of {}", current.date);
    println!("{}", SEPARATOR);
    println!("  Quadrant:  {} ({})", current.label, current.regime.code());
    println!(
        "  {}: {:.4} (rank {:.2}, window median {})",
        report.indicator_a,
        current.indicator_a,
        current.a_rank,
        format_median(current.a_window_median)
    );
    println!(
        "  {}: {:.4} (rank {:.2}, window median {})",
        report.indicator_b,
        current.indicator_b,
        current.b_rank,
        format_median(current.b_window_median)
    );
    println!("  Threshold: {:.2}", current.threshold);

    if let Some(prefs) = report
        .monthly
        .preferences
        .iter()
        .find(|p| p.regime == current.regime)
    {
        println!("  Favorites: {}", prefs.favorite_by_return.join(", "));
        println!("  Avoid:     {}", prefs.unfavorite_by_return.join(", "));
    }
    Ok(())
}

fn cmd_validate(config: BacktestConfig, data: &Path) -> Result<()> {
    let validator = DataIntegrityValidator::new(data, config);
    let report = validator
        .validate()
        .with_context(|| format!("Failed to load data from {}", data.display()))?;

    println!("{}", SEPARATOR);
    for check in &report.checks {
        println!("{}", check);
    }
    println!("{}", SEPARATOR);
    println!("{}", report.summary());

    if !report.all_passed() {
        bail!("{} check(s) failed", report.failed_checks().len());
    }
    Ok(())
}

fn format_median(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}
