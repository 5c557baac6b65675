//! HoldFast CLI: run, check-config, and synthetic commands.
//!
//! Commands:
//! - `run`: label a feature CSV with positions and save artifacts
//! - `check-config`: validate a TOML config and print the resolved settings
//! - `synthetic`: write a deterministic synthetic feature CSV

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use holdfast_runner::runner::run_from_file;
use holdfast_runner::synthetic::save_synthetic_csv;
use holdfast_runner::{save_artifacts, RunConfig, RunResult};

#[derive(Parser)]
#[command(
    name = "holdfast",
    about = "HoldFast: position lifecycle engine for score-driven strategies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a feature CSV into a position series.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Feature CSV, grouped by symbol and time-ordered within each symbol.
        #[arg(long)]
        features: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Run instruments on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Validate a config file and print the resolved settings.
    CheckConfig {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Write a deterministic synthetic feature CSV.
    Synthetic {
        /// Symbols to generate (e.g., BTC-USDT ETH-USDT).
        #[arg(long, num_args = 1.., required = true)]
        symbols: Vec<String>,

        /// Bars per symbol.
        #[arg(long, default_value_t = 1000)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "holdfast=info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            features,
            output_dir,
            sequential,
        } => run_cmd(config, features, output_dir, sequential),
        Commands::CheckConfig { config } => check_config_cmd(config),
        Commands::Synthetic {
            symbols,
            bars,
            seed,
            output,
        } => synthetic_cmd(symbols, bars, seed, output),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<RunConfig> {
    Ok(match path {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    })
}

fn run_cmd(
    config_path: Option<PathBuf>,
    features: PathBuf,
    output_dir: PathBuf,
    sequential: bool,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;
    if sequential {
        config.parallel = false;
    }

    info!(run_id = %config.run_id(), features = %features.display(), "starting run");
    let result = run_from_file(&config, &features)?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn check_config_cmd(config_path: PathBuf) -> Result<()> {
    let config = RunConfig::load(&config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("run_id: {}", config.run_id());
    Ok(())
}

fn synthetic_cmd(symbols: Vec<String>, bars: usize, seed: u64, output: PathBuf) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be at least 1");
    }
    let rows = save_synthetic_csv(&output, &symbols, bars, seed)?;
    info!(rows, symbols = symbols.len(), path = %output.display(), "wrote synthetic features");
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!();
    println!("=== Position Run ===");
    println!("Run ID:         {}", result.run_id);
    println!("Instruments:    {}", result.diagnostics.len());
    println!("Bars:           {}", result.bar_count());
    println!();
    println!(
        "{:<14} {:>8} {:>8} {:>6} {:>6} {:>9} {:>9} {:>8}",
        "symbol", "bars", "entries", "stops", "hyst", "exposure", "turnover", "avg hold"
    );
    for d in &result.diagnostics {
        let avg_hold = d
            .mean_holding_bars
            .map(|m| format!("{m:.1}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} {:>8} {:>8} {:>6} {:>6} {:>8.1}% {:>9.4} {:>8}",
            d.symbol,
            d.bars,
            d.entries,
            d.trailing_stop_exits,
            d.hysteresis_exits,
            d.exposure * 100.0,
            d.turnover_rate,
            avg_hold
        );
    }
    for q in result.data_quality.iter().filter(|q| !q.is_clean()) {
        println!(
            "WARNING: {}: {} bars with missing features, {} without a regime gate, {} with inconsistent prices",
            q.symbol, q.missing_feature_bars, q.missing_gate_bars, q.insane_bars
        );
    }
    println!();
}
