//! Dihadron asymmetry aggregation CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dh_core::{HadronPair, N_TERMS};
use dh_engine::{loader, report, Aggregator};
use std::path::PathBuf;

/// Purity grid used as the signal region when the channel has a neutral
/// pion and no explicit region was requested.
const DEFAULT_PI0_SIGNAL_REGION: &str = "signal_purity_2_2";

#[derive(Parser)]
#[command(name = "dihadron")]
#[command(about = "Dihadron beam-spin asymmetry aggregation and systematics")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate fit results and systematics into a report document
    Report {
        /// Project directory holding the config_* bin directories
        #[arg(short, long)]
        project: PathBuf,

        /// Output report file (YAML)
        #[arg(short, long)]
        output: PathBuf,

        /// Channels to aggregate, e.g. piplus_pi0
        #[arg(long, value_delimiter = ',', default_values_t = [
            "piplus_piplus".to_string(),
            "piplus_piminus".to_string(),
            "piplus_pi0".to_string(),
            "piminus_piminus".to_string(),
            "piminus_pi0".to_string(),
        ])]
        pairs: Vec<String>,

        /// Run periods to aggregate
        #[arg(long, value_delimiter = ',', default_values_t = [
            "Fall2018_RGA_inbending".to_string(),
        ])]
        run_periods: Vec<String>,

        /// Unfold bin migration with the Monte Carlo response matrix
        #[arg(long)]
        unfold: bool,

        /// Append to an existing report instead of replacing it
        #[arg(long)]
        append: bool,

        /// Neighbor window for the local migration estimate
        #[arg(long, default_value = "3")]
        window: usize,

        /// Fit region to report for neutral-pion channels
        #[arg(long, default_value = DEFAULT_PI0_SIGNAL_REGION)]
        signal_region: String,
    },

    /// Print version information
    Version,
}

fn cmd_report(
    project: &PathBuf,
    output: &PathBuf,
    pairs: &[String],
    run_periods: &[String],
    unfold: bool,
    append: bool,
    window: usize,
    signal_region: &str,
) -> Result<()> {
    let mut records = Vec::new();
    for pair_name in pairs {
        let pair = HadronPair::parse(pair_name)
            .with_context(|| format!("unknown channel '{pair_name}'"))?;
        for run_period in run_periods {
            let data = loader::load_project(project, pair, run_period).with_context(|| {
                format!("loading {} / {run_period} from {}", pair, project.display())
            })?;
            if !data.has_fit_results() {
                tracing::warn!("no fit results for {pair} / {run_period}; skipping");
                continue;
            }

            let (region, bin_prefix) = if pair.contains_pi0() {
                (signal_region, "signal")
            } else {
                ("signal", "full")
            };
            let aggregator =
                Aggregator::new(&data).with_window(window).with_unfolding(unfold);
            for term in 0..N_TERMS {
                records.extend(aggregator.run(region, term, bin_prefix)?);
            }
            tracing::info!("aggregated {pair} / {run_period} ({} bins)", data.n_bins());
        }
    }

    report::write(output, &records, append)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("wrote {} records to {}", records.len(), output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Report {
            project,
            output,
            pairs,
            run_periods,
            unfold,
            append,
            window,
            signal_region,
        } => cmd_report(
            &project,
            &output,
            &pairs,
            &run_periods,
            unfold,
            append,
            window,
            &signal_region,
        ),
        Commands::Version => {
            println!("dihadron {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
