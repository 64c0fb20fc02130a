//! # diphoton
//!
//! A command-line tool for sweeping di-photon selection thresholds over
//! ATLAS open-data event files.
//!
//! ```bash
//! # Run a sweep over a single local file
//! diphoton run --config settings.json --input data_D.GamGam.parquet
//!
//! # Process a manifest of sources, resumably
//! diphoton run --config settings.json --manifest sources.txt --out-dir results
//!
//! # Generate mock data and inspect it
//! diphoton demo demo_events.parquet --events 10000
//! diphoton info demo_events.parquet
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use diphoton::data::fetch::Fetcher;
use diphoton::data::io::{peek_parquet, write_parquet};
use diphoton::data::synthetic_dataset;
use diphoton::pipeline::{process_source, run_manifest, AnalysisContext};
use diphoton::Settings;

/// diphoton - Di-photon invariant mass analysis over ATLAS open data
#[derive(Parser)]
#[command(name = "diphoton")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the threshold sweep over one source or a manifest of sources
    Run {
        /// Settings file
        #[arg(short, long, default_value = "settings.json")]
        config: PathBuf,

        /// A single input source (local path or http(s) URL)
        #[arg(short, long, conflicts_with = "manifest")]
        input: Option<String>,

        /// Manifest of sources, one per line
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Output directory for all artifacts and the run ledger
        #[arg(short, long, default_value = "results")]
        out_dir: PathBuf,

        /// Directory for local copies of remote sources
        #[arg(long, default_value = "download_cache")]
        cache_dir: PathBuf,
    },

    /// Generate a deterministic mock event file for testing
    Demo {
        /// Output Parquet file path
        #[arg(value_name = "OUTPUT", default_value = "demo_events.parquet")]
        output: PathBuf,

        /// Number of events to generate
        #[arg(short, long, default_value = "10000")]
        events: usize,

        /// Generator seed
        #[arg(short, long, default_value = "0")]
        seed: u64,
    },

    /// Display information about an event file
    Info {
        /// Input Parquet file path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Run {
            config,
            input,
            manifest,
            out_dir,
            cache_dir,
        } => cmd_run(config, input, manifest, out_dir, cache_dir),
        Commands::Demo {
            output,
            events,
            seed,
        } => cmd_demo(output, events, seed),
        Commands::Info { file } => cmd_info(file),
    }
}

fn cmd_run(
    config: PathBuf,
    input: Option<String>,
    manifest: Option<PathBuf>,
    out_dir: PathBuf,
    cache_dir: PathBuf,
) -> Result<()> {
    let settings = Settings::from_file(&config)
        .with_context(|| format!("Invalid configuration in {}", config.display()))?;
    println!(
        "{}: sweeping pt_min over [{}, {}] {}",
        settings.analysis_name, settings.sweep.pt_min, settings.sweep.pt_max, settings.units.pt
    );
    let mut ctx = AnalysisContext::new(settings, &out_dir)?;
    let fetcher = Fetcher::new(cache_dir);

    match (input, manifest) {
        (Some(locator), None) => {
            let dir = ctx.out_dir.clone();
            process_source(&mut ctx, &fetcher, &locator, &dir)
                .with_context(|| format!("Failed to process {locator}"))?;
            Ok(())
        }
        (None, Some(manifest_path)) => {
            let outcome = run_manifest(&mut ctx, &fetcher, &manifest_path)
                .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
            println!(
                "Batch complete: {} processed, {} skipped, {} failed",
                outcome.processed, outcome.skipped, outcome.failed
            );
            if outcome.failed > 0 {
                bail!(
                    "{} source(s) failed; re-run to retry them",
                    outcome.failed
                );
            }
            Ok(())
        }
        _ => bail!("Provide exactly one of --input or --manifest"),
    }
}

fn cmd_demo(output: PathBuf, events: usize, seed: u64) -> Result<()> {
    let dataset = synthetic_dataset(events, seed);
    write_parquet(&dataset, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} mock events to {}", events, output.display());
    Ok(())
}

fn cmd_info(file: PathBuf) -> Result<()> {
    let (rows, columns) = peek_parquet(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    println!("{}", file.display());
    println!("  events:  {rows}");
    println!("  columns: {}", columns.join(", "));
    Ok(())
}
