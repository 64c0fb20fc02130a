use indexmap::IndexMap;
use log::{info, warn};
use serde::Serialize;

use crate::config::{Binning, Settings};
use crate::data::Dataset;
use crate::kinematics::{reconstruct, Observables};
use crate::selection::select_pairs;
use crate::utils::{histogram, histogram_freedman_diaconis, Histogram, SummaryStats};

/// The step used when the settings leave `pt_step` unset or non-positive
/// [GeV].
pub const DEFAULT_STEP: f64 = 2.5;

/// Enumerate sweep thresholds in ascending order.
///
/// Values are `start + i·step` for every multiple at or below `stop`, with
/// a small tolerance so floating-point rounding never drops an endpoint
/// that is an exact multiple; if the last multiple falls short of `stop`,
/// `stop` itself is appended. The sequence never exceeds `stop` and always
/// includes it exactly once. Returns the thresholds and the step actually
/// used.
pub fn enumerate_thresholds(start: f64, stop: f64, step: Option<f64>) -> (Vec<f64>, f64) {
    let step = match step {
        Some(step) if step > 0.0 => step,
        _ => {
            warn!("pt_step not set (or non-positive); using the default step of {DEFAULT_STEP} GeV");
            DEFAULT_STEP
        }
    };
    let mut thresholds = Vec::new();
    let mut i = 0u64;
    loop {
        let value = start + i as f64 * step;
        if value > stop + step * 1e-9 {
            break;
        }
        thresholds.push(value);
        i += 1;
    }
    if let Some(&last) = thresholds.last() {
        if stop - last > step * 1e-9 {
            thresholds.push(stop);
        }
    }
    (thresholds, step)
}

/// One completed threshold run.
///
/// `edges`/`counts` are the invariant-mass histogram under the configured
/// binning policy. `stats` holds the descriptive statistics per observable
/// and is empty when no events survive; zero-count runs are recorded, never
/// skipped. The raw observable arrays ride along unserialized for the
/// reporter's plots.
#[derive(Debug, Clone, Serialize)]
pub struct SweepRun {
    /// Sequential 1-based identifier, ascending with the threshold.
    pub run_id: usize,
    /// The pt threshold for this run [GeV].
    pub pt_cut: f64,
    /// Number of events surviving selection.
    pub n_events: usize,
    /// Invariant-mass histogram bin edges [GeV].
    pub edges: Vec<f64>,
    /// Invariant-mass histogram bin counts.
    pub counts: Vec<u64>,
    /// Descriptive statistics per observable.
    pub stats: IndexMap<String, SummaryStats>,
    /// Raw observable arrays, keyed like `stats`.
    #[serde(skip)]
    pub values: IndexMap<String, Vec<f64>>,
}

/// Run selection + reconstruction once per threshold, ascending.
///
/// Returns the per-threshold runs and the step actually used.
pub fn run_sweep(dataset: &Dataset, settings: &Settings) -> (Vec<SweepRun>, f64) {
    let (thresholds, step) = enumerate_thresholds(
        settings.sweep.pt_min,
        settings.sweep.pt_max,
        settings.sweep.pt_step,
    );
    let n_runs = thresholds.len();
    let runs = thresholds
        .into_iter()
        .enumerate()
        .map(|(index, pt_cut)| {
            let run = run_threshold(dataset, settings, index + 1, pt_cut);
            info!(
                "Run {}/{n_runs} complete with pt_min = {pt_cut:.2} GeV ({} events)",
                index + 1,
                run.n_events
            );
            run
        })
        .collect();
    (runs, step)
}

fn run_threshold(dataset: &Dataset, settings: &Settings, run_id: usize, pt_cut: f64) -> SweepRun {
    let pairs = select_pairs(dataset, &settings.cuts_at(pt_cut));
    let mut values: IndexMap<String, Vec<f64>> = Observables::NAMES
        .iter()
        .map(|name| ((*name).to_string(), Vec::with_capacity(pairs.len())))
        .collect();
    for pair in &pairs {
        let observables = reconstruct(pair);
        for name in Observables::NAMES {
            values[*name].push(observables.get(name));
        }
    }
    let mass_hist = binned(&values["masses"], &settings.binning);
    let stats = values
        .iter()
        .filter_map(|(name, array)| SummaryStats::compute(array).map(|s| (name.clone(), s)))
        .collect();
    SweepRun {
        run_id,
        pt_cut,
        n_events: pairs.len(),
        edges: mass_hist.edges,
        counts: mass_hist.counts,
        stats,
        values,
    }
}

fn binned(values: &[f64], binning: &Binning) -> Histogram {
    match binning {
        Binning::Fixed { bins, range } => histogram(values, *bins, *range),
        Binning::FreedmanDiaconis => histogram_freedman_diaconis(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_multiple_includes_stop() {
        let (thresholds, step) = enumerate_thresholds(10.0, 100.0, Some(5.0));
        assert_eq!(step, 5.0);
        assert_eq!(thresholds.len(), 19);
        assert_relative_eq!(thresholds[0], 10.0);
        assert_relative_eq!(*thresholds.last().unwrap(), 100.0);
    }

    #[test]
    fn test_non_multiple_still_includes_stop() {
        let (thresholds, _) = enumerate_thresholds(0.0, 10.0, Some(3.0));
        assert_eq!(thresholds, vec![0.0, 3.0, 6.0, 9.0, 10.0]);
    }

    #[test]
    fn test_large_remainder_includes_stop_without_overshoot() {
        // Remainder (2.5) greater than step/2: no multiple beyond stop, and
        // stop itself is appended.
        let (thresholds, _) = enumerate_thresholds(0.0, 10.5, Some(4.0));
        assert_eq!(thresholds, vec![0.0, 4.0, 8.0, 10.5]);
    }

    #[test]
    fn test_stop_never_duplicated() {
        let (thresholds, _) = enumerate_thresholds(0.1, 0.7, Some(0.2));
        assert_eq!(thresholds.len(), 4);
        assert_relative_eq!(*thresholds.last().unwrap(), 0.7, max_relative = 1e-12);
    }

    #[test]
    fn test_default_step_fallback() {
        let (thresholds, step) = enumerate_thresholds(10.0, 20.0, None);
        assert_eq!(step, DEFAULT_STEP);
        assert_eq!(thresholds, vec![10.0, 12.5, 15.0, 17.5, 20.0]);
        let (_, step) = enumerate_thresholds(10.0, 20.0, Some(-1.0));
        assert_eq!(step, DEFAULT_STEP);
    }

    #[test]
    fn test_degenerate_range_yields_single_threshold() {
        let (thresholds, _) = enumerate_thresholds(25.0, 25.0, Some(5.0));
        assert_eq!(thresholds, vec![25.0]);
    }

    #[test]
    fn test_thresholds_ascend() {
        let (thresholds, _) = enumerate_thresholds(0.0, 50.0, Some(7.0));
        assert!(thresholds.windows(2).all(|w| w[0] < w[1]));
    }
}
