//! Drivers tying the pipeline together.
//!
//! [`AnalysisContext`] carries what used to be ambient state (settings,
//! output directory, ledger) explicitly through the drivers. The batch
//! driver isolates failures per manifest entry: a source that cannot be
//! fetched or decoded is logged and left unmarked in the ledger so a later
//! invocation retries it, while the remaining entries still run.

use log::{error, info};
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::data::fetch::{DataSource, Fetcher};
use crate::data::{io::read_parquet, Dataset};
use crate::ledger::Ledger;
use crate::report::{write_plots, write_stats_js, write_summary, Summary};
use crate::sweep::run_sweep;
use crate::AnalysisResult;

/// Explicit run state passed into the drivers and the reporter.
#[derive(Debug)]
pub struct AnalysisContext {
    pub settings: Settings,
    pub out_dir: PathBuf,
    pub ledger: Ledger,
}

impl AnalysisContext {
    /// Create the output directory and load (or start) its ledger.
    pub fn new(settings: Settings, out_dir: impl Into<PathBuf>) -> AnalysisResult<Self> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)?;
        let ledger = Ledger::load(out_dir.join("processed.log"))?;
        Ok(Self {
            settings,
            out_dir,
            ledger,
        })
    }
}

/// Outcome counts of one batch invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Sources processed to completion on this invocation.
    pub processed: usize,
    /// Sources skipped because the ledger already contained them.
    pub skipped: usize,
    /// Sources that failed and remain eligible for a retry.
    pub failed: usize,
}

/// Sweep an already-loaded dataset and write all artifacts into `dir`.
pub fn analyze_dataset(
    settings: &Settings,
    dataset: &Dataset,
    dir: &Path,
) -> AnalysisResult<Summary> {
    std::fs::create_dir_all(dir)?;
    let (runs, step_used) = run_sweep(dataset, settings);
    let summary = Summary::new(settings, step_used, runs);
    write_summary(&dir.join(&settings.output_file), &summary)?;
    for run in &summary.runs {
        if run.n_events == 0 {
            continue;
        }
        if settings.stats_js {
            write_stats_js(dir, run)?;
        }
        if settings.plots {
            write_plots(&dir.join("plots"), run)?;
        }
    }
    println!(
        "Sweep complete: {} runs written to {}",
        summary.runs.len(),
        dir.display()
    );
    Ok(summary)
}

/// Fetch, load, sweep, and report a single source into `dir`, then mark it
/// done.
pub fn process_source(
    ctx: &mut AnalysisContext,
    fetcher: &Fetcher,
    locator: &str,
    dir: &Path,
) -> AnalysisResult<()> {
    let source = DataSource::parse(locator)?;
    let local_path = fetcher.fetch(&source)?;
    let dataset = read_parquet(&local_path)?;
    println!("Loaded {} events from {locator}", dataset.n_events());
    analyze_dataset(&ctx.settings, &dataset, dir)?;
    ctx.ledger.mark_done(&source.id())?;
    Ok(())
}

/// Process every manifest entry that the ledger does not already contain.
pub fn run_manifest(
    ctx: &mut AnalysisContext,
    fetcher: &Fetcher,
    manifest_path: &Path,
) -> AnalysisResult<BatchOutcome> {
    let entries = read_manifest(manifest_path)?;
    let mut outcome = BatchOutcome::default();
    for locator in &entries {
        let source = match DataSource::parse(locator) {
            Ok(source) => source,
            Err(err) => {
                error!("Could not resolve manifest entry {locator}: {err}");
                outcome.failed += 1;
                continue;
            }
        };
        if ctx.ledger.contains(&source.id()) {
            info!("Skipping already-processed source {locator}");
            outcome.skipped += 1;
            continue;
        }
        let dir = ctx.out_dir.join(source_dir_name(locator));
        match process_source(ctx, fetcher, locator, &dir) {
            Ok(()) => outcome.processed += 1,
            Err(err) => {
                error!("Source {locator} failed and will be retried on a later run: {err}");
                outcome.failed += 1;
            }
        }
    }
    Ok(outcome)
}

/// Manifest entries: one locator per line, blank lines and `#` comments
/// skipped.
pub fn read_manifest(path: &Path) -> AnalysisResult<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// A per-source output subdirectory name: the locator's file stem,
/// sanitized.
fn source_dir_name(locator: &str) -> String {
    let tail = locator
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(locator);
    let stem = tail.strip_suffix(".parquet").unwrap_or(tail);
    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "source".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.txt");
        std::fs::write(
            &path,
            "# ATLAS open data\n\ndata_A.parquet\n  https://opendata.cern.ch/data_B.parquet  \n",
        )
        .unwrap();
        let entries = read_manifest(&path).unwrap();
        assert_eq!(
            entries,
            vec![
                "data_A.parquet".to_string(),
                "https://opendata.cern.ch/data_B.parquet".to_string()
            ]
        );
    }

    #[test]
    fn test_source_dir_name() {
        assert_eq!(source_dir_name("./runs/data_A.parquet"), "data_A");
        assert_eq!(
            source_dir_name("https://opendata.cern.ch/run/data_B.parquet"),
            "data_B"
        );
        assert_eq!(source_dir_name("weird name?.parquet"), "weird_name_");
    }
}
