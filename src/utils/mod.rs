use accurate::sum::Klein;
use accurate::traits::*;
use serde::{Deserialize, Serialize};

/// Four-momentum arithmetic.
pub mod vectors;

/// A helper method to get histogram edges from evenly-spaced `bins` over a
/// given `range`
///
/// # See Also
/// [`Histogram`]
/// [`get_bin_index`]
pub fn get_bin_edges(bins: usize, range: (f64, f64)) -> Vec<f64> {
    let bin_width = (range.1 - range.0) / (bins as f64);
    (0..=bins)
        .map(|i| range.0 + (i as f64 * bin_width))
        .collect()
}

/// A helper method to obtain the index of a bin where a value should go in a
/// histogram with evenly spaced `bins` over a given `range`. A value exactly
/// equal to the upper range edge falls in the last bin.
///
/// # See Also
/// [`Histogram`]
/// [`get_bin_edges`]
pub fn get_bin_index(value: f64, bins: usize, limits: (f64, f64)) -> Option<usize> {
    if value >= limits.0 && value <= limits.1 {
        let bin_width = (limits.1 - limits.0) / bins as f64;
        let bin_index = ((value - limits.0) / bin_width).floor() as usize;
        Some(bin_index.min(bins - 1))
    } else {
        None
    }
}

/// A simple struct which represents a histogram
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    /// The edges of each bin (length is one greater than `counts`)
    pub edges: Vec<f64>,
    /// The number of values found in each bin
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Total number of binned values (values outside the range are not
    /// counted).
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// A method which creates a histogram from some data by binning it with
/// evenly spaced `bins` within the given `range`
pub fn histogram<T: AsRef<[f64]>>(values: T, bins: usize, range: (f64, f64)) -> Histogram {
    assert!(bins > 0, "Number of bins must be greater than zero!");
    assert!(
        range.1 > range.0,
        "The lower edge of the range must be smaller than the upper edge!"
    );
    let mut counts = vec![0u64; bins];
    for &value in values.as_ref() {
        if let Some(bin_index) = get_bin_index(value, bins, range) {
            counts[bin_index] += 1;
        }
    }
    Histogram {
        edges: get_bin_edges(bins, range),
        counts,
    }
}

/// A method which creates a histogram using the Freedman-Diaconis bin-width
/// rule over the 2nd to 98th percentile range of the data.
///
/// Clipping to the percentile range only affects the binning; values outside
/// the clipped range simply fall out of the histogram. Degenerate inputs
/// (empty data, zero interquartile range, or a collapsed range) fall back to
/// a single bin of unit width centered on the data.
pub fn histogram_freedman_diaconis<T: AsRef<[f64]>>(values: T) -> Histogram {
    let values = values.as_ref();
    if values.is_empty() {
        return Histogram {
            edges: vec![-0.5, 0.5],
            counts: vec![0],
        };
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let low = percentile_sorted(&sorted, 0.02);
    let high = percentile_sorted(&sorted, 0.98);
    if high <= low {
        return histogram(values, 1, (low - 0.5, low + 0.5));
    }
    let clipped: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= low && *v <= high)
        .collect();
    let iqr = percentile_sorted(&clipped, 0.75) - percentile_sorted(&clipped, 0.25);
    let width = 2.0 * iqr / (clipped.len() as f64).cbrt();
    let bins = if width > 0.0 {
        (((high - low) / width).ceil() as usize).max(1)
    } else {
        1
    };
    histogram(values, bins, (low, high))
}

/// Linearly interpolated quantile of pre-sorted data, `q` in `[0, 1]`.
///
/// Matches numpy's default interpolation. Panics on empty input.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    assert!(!sorted.is_empty(), "Cannot take a quantile of no data!");
    let h = q * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let frac = h - lo as f64;
    if lo + 1 < sorted.len() {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    } else {
        sorted[lo]
    }
}

/// Descriptive statistics over one observable at one threshold.
///
/// Standard deviation is the population deviation and quantiles use linear
/// interpolation, matching the numpy defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: u64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
}

impl SummaryStats {
    /// Compute statistics over the full (unclipped) array. Returns [`None`]
    /// for empty input.
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().copied().sum_with_accumulator::<Klein<_>>() / n;
        let var = values
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum_with_accumulator::<Klein<_>>()
            / n;
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Some(Self {
            count: values.len() as u64,
            mean,
            std: var.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: percentile_sorted(&sorted, 0.5),
            q1: percentile_sorted(&sorted, 0.25),
            q3: percentile_sorted(&sorted, 0.75),
        })
    }
}
