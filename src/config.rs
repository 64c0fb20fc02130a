//! Settings-file support.
//!
//! The analysis is driven by a JSON settings file:
//!
//! ```json
//! {
//!   "analysis_name": "H -> gamma gamma pt scan",
//!   "sweep": { "pt_min": 10.0, "pt_max": 100.0, "pt_step": 5.0 },
//!   "cuts": { "eta_max": 2.37, "isolation_max": 0.065 },
//!   "binning": { "mode": "fixed", "bins": 50, "range": [50.0, 170.0] },
//!   "output_file": "results.json",
//!   "units": { "pt": "GeV" }
//! }
//! ```
//!
//! Only `analysis_name` and `sweep` are required; every other section has a
//! default. A missing file, malformed JSON, or an invalid value is a fatal
//! configuration error reported before any data is fetched.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::selection::Cuts;
use crate::{AnalysisError, AnalysisResult};

/// Root settings structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Title used in report metadata and plot captions.
    pub analysis_name: String,
    /// The transverse-momentum threshold sweep.
    pub sweep: SweepSettings,
    /// Base kinematic cuts applied at every threshold.
    #[serde(default)]
    pub cuts: CutSettings,
    /// Histogram binning policy.
    #[serde(default)]
    pub binning: Binning,
    /// File name of the consolidated summary, relative to the output
    /// directory.
    #[serde(default = "default_output_file")]
    pub output_file: String,
    /// Unit labels for presentation; values are GeV throughout.
    #[serde(default)]
    pub units: Units,
    /// Whether to emit per-threshold JS stats documents.
    #[serde(default = "default_true")]
    pub stats_js: bool,
    /// Whether to render histogram plots.
    #[serde(default = "default_true")]
    pub plots: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// First threshold [GeV].
    pub pt_min: f64,
    /// Last threshold [GeV], always included in the enumeration.
    pub pt_max: f64,
    /// Step between thresholds [GeV]. When absent or non-positive the
    /// driver falls back to a default step with a warning.
    #[serde(default)]
    pub pt_step: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutSettings {
    /// Maximum photon |pseudorapidity|.
    pub eta_max: f64,
    /// Maximum isolation-cone energy as a fraction of the photon pt.
    pub isolation_max: f64,
}

impl Default for CutSettings {
    fn default() -> Self {
        Self {
            eta_max: 2.37,
            isolation_max: 0.065,
        }
    }
}

/// The histogram binning policy, an explicit tagged variant rather than two
/// divergent code paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Binning {
    /// A fixed bin count over a fixed range.
    Fixed { bins: usize, range: (f64, f64) },
    /// The Freedman-Diaconis rule over the 2nd to 98th percentile range of
    /// each observable.
    FreedmanDiaconis,
}

impl Default for Binning {
    fn default() -> Self {
        Self::Fixed {
            bins: 50,
            range: (50.0, 170.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Units {
    pub pt: String,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            pt: "GeV".to_string(),
        }
    }
}

fn default_output_file() -> String {
    "results.json".to_string()
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Load and validate settings from a JSON file.
    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            AnalysisError::Config(format!(
                "Failed to read settings file '{}': {err}",
                path.display()
            ))
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate settings from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> AnalysisResult<Self> {
        let settings: Settings = serde_json::from_str(content)
            .map_err(|err| AnalysisError::Config(format!("Malformed settings: {err}")))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> AnalysisResult<()> {
        if self.analysis_name.is_empty() {
            return Err(AnalysisError::Config(
                "'analysis_name' must not be empty".to_string(),
            ));
        }
        if !(self.sweep.pt_max >= self.sweep.pt_min) {
            return Err(AnalysisError::Config(format!(
                "Sweep bounds are inverted: pt_min = {}, pt_max = {}",
                self.sweep.pt_min, self.sweep.pt_max
            )));
        }
        if self.cuts.eta_max <= 0.0 {
            return Err(AnalysisError::Config(
                "'cuts.eta_max' must be positive".to_string(),
            ));
        }
        if let Binning::Fixed { bins, range } = &self.binning {
            if *bins == 0 {
                return Err(AnalysisError::Config(
                    "'binning.bins' must be positive".to_string(),
                ));
            }
            if range.1 <= range.0 {
                return Err(AnalysisError::Config(format!(
                    "'binning.range' is inverted: [{}, {}]",
                    range.0, range.1
                )));
            }
        }
        Ok(())
    }

    /// The selection cuts at a given sweep threshold.
    pub fn cuts_at(&self, pt_min: f64) -> Cuts {
        Cuts {
            pt_min,
            eta_max: self.cuts.eta_max,
            isolation_max: self.cuts.isolation_max,
        }
    }
}
