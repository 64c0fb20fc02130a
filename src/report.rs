//! Serialization of sweep results.
//!
//! Three artifact kinds per sweep: the consolidated JSON summary (one record
//! per threshold run), optional per-threshold stats documents in a
//! script-embeddable JS format, and SVG histogram plots, one per observable
//! per threshold, under a `plots/` subdirectory.

use plotters::prelude::*;
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::kinematics::Observables;
use crate::sweep::SweepRun;
use crate::utils::{histogram_freedman_diaconis, Histogram};
use crate::{AnalysisError, AnalysisResult};

/// Metadata block of the consolidated summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetadata {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub pt_range_tested: (f64, f64),
    pub pt_step_used: f64,
    pub num_steps: usize,
}

/// The consolidated sweep summary: metadata plus one record per run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub metadata: SummaryMetadata,
    pub runs: Vec<SweepRun>,
}

impl Summary {
    pub fn new(settings: &Settings, step_used: f64, runs: Vec<SweepRun>) -> Self {
        Self {
            metadata: SummaryMetadata {
                title: settings.analysis_name.clone(),
                x_axis_title: format!("Invariant mass ({})", settings.units.pt),
                y_axis_title: "Events / bin".to_string(),
                pt_range_tested: (settings.sweep.pt_min, settings.sweep.pt_max),
                pt_step_used: step_used,
                num_steps: runs.len(),
            },
            runs,
        }
    }
}

/// Write the consolidated summary, atomically.
///
/// The JSON is serialized into a temporary file in the target directory and
/// moved over the destination in one rename, so a failure partway through
/// serialization leaves any previous summary untouched.
pub fn write_summary(path: &Path, summary: &Summary) -> AnalysisResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    serde_json::to_writer_pretty(&mut temp, summary)?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Write one run's statistics as a script-embeddable JS document.
///
/// The document declares a single `const photon_{T}GeV_stats` object so a
/// presentation page can include it directly.
pub fn write_stats_js(dir: &Path, run: &SweepRun) -> AnalysisResult<PathBuf> {
    let label = threshold_label(run.pt_cut);
    let path = dir.join(format!("photon_{label}GeV_stats.js"));
    let mut content = String::from("// Auto-generated photon statistics\n\n");
    content.push_str(&format!("const photon_{label}GeV_stats = "));
    content.push_str(&serde_json::to_string_pretty(&run.stats)?);
    content.push_str(";\n");
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Render one SVG histogram per observable for a run.
///
/// Plots always bin with the Freedman-Diaconis rule over the 2nd to 98th
/// percentile range. Clipping applies to the plotted bins only; the
/// statistics in the summary cover the full arrays. Runs with no surviving
/// events produce no plots. Returns the paths written.
pub fn write_plots(plots_dir: &Path, run: &SweepRun) -> AnalysisResult<Vec<PathBuf>> {
    if run.n_events == 0 {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(plots_dir)?;
    let label = threshold_label(run.pt_cut);
    let mut written = Vec::with_capacity(run.values.len());
    for (name, values) in &run.values {
        let hist = histogram_freedman_diaconis(values);
        let path = plots_dir.join(format!("photon_{label}GeV_distribution_{name}.svg"));
        render_histogram(
            &path,
            &hist,
            Observables::label(name),
            &format!(
                "Distribution of {} ({label} GeV cut)",
                Observables::label(name)
            ),
        )?;
        written.push(path);
    }
    Ok(written)
}

fn render_histogram(
    path: &Path,
    hist: &Histogram,
    x_label: &str,
    caption: &str,
) -> AnalysisResult<()> {
    let root = SVGBackend::new(path, (600, 400)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let x_min = hist.edges[0];
    let x_max = *hist.edges.last().unwrap_or(&(x_min + 1.0));
    let y_max = hist.counts.iter().max().copied().unwrap_or(0).max(1);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0u64..y_max + y_max / 10 + 1)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Events")
        .draw()
        .map_err(plot_err)?;

    // Step outline through the bin tops, closed to the baseline.
    let mut points = Vec::with_capacity(2 * hist.counts.len() + 2);
    points.push((hist.edges[0], 0u64));
    for (i, &count) in hist.counts.iter().enumerate() {
        points.push((hist.edges[i], count));
        points.push((hist.edges[i + 1], count));
    }
    points.push((x_max, 0));
    chart
        .draw_series(LineSeries::new(points, &BLUE))
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

fn plot_err<E: Display>(err: E) -> AnalysisError {
    AnalysisError::PlotError(err.to_string())
}

/// Threshold as a file-name token: integral thresholds render without a
/// decimal point, fractional ones swap `.` for `p`.
fn threshold_label(threshold: f64) -> String {
    if (threshold - threshold.round()).abs() < 1e-9 {
        format!("{threshold:.0}")
    } else {
        format!("{threshold}").replace('.', "p")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::data::synthetic_dataset;
    use crate::sweep::run_sweep;

    fn settings() -> Settings {
        Settings::from_str(
            r#"{
                "analysis_name": "test scan",
                "sweep": { "pt_min": 10.0, "pt_max": 30.0, "pt_step": 10.0 },
                "binning": { "mode": "fixed", "bins": 20, "range": [0.0, 200.0] }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_threshold_label() {
        assert_eq!(threshold_label(50.0), "50");
        assert_eq!(threshold_label(12.5), "12p5");
        assert_eq!(threshold_label(100.0), "100");
    }

    #[test]
    fn test_summary_round_trips_as_json() {
        let settings = settings();
        let dataset = synthetic_dataset(200, 11);
        let (runs, step) = run_sweep(&dataset, &settings);
        let summary = Summary::new(&settings, step, runs);
        let text = serde_json::to_string(&summary).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["metadata"]["title"], "test scan");
        assert_eq!(parsed["metadata"]["num_steps"], 3);
        assert_eq!(parsed["runs"].as_array().unwrap().len(), 3);
        assert!(parsed["runs"][0]["stats"].is_object());
        // Raw observable arrays never leak into the serialized record.
        assert!(parsed["runs"][0].get("values").is_none());
    }

    #[test]
    fn test_summary_write_is_atomic_replace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let settings = settings();
        let dataset = synthetic_dataset(100, 5);
        let (runs, step) = run_sweep(&dataset, &settings);
        let summary = Summary::new(&settings, step, runs);
        write_summary(&path, &summary).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        write_summary(&path, &summary).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
        // No stray temp files remain next to the summary.
        let others: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path() != path)
            .collect();
        assert!(others.is_empty());
    }

    #[test]
    fn test_stats_js_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings();
        let dataset = synthetic_dataset(200, 11);
        let (runs, _) = run_sweep(&dataset, &settings);
        let path = write_stats_js(dir.path(), &runs[0]).unwrap();
        assert_eq!(path.file_name().unwrap(), "photon_10GeV_stats.js");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("// Auto-generated photon statistics"));
        assert!(content.contains("const photon_10GeV_stats = "));
        assert!(content.trim_end().ends_with(';'));
    }

    #[test]
    fn test_plot_files_written_per_observable() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings();
        let dataset = synthetic_dataset(300, 11);
        let (runs, _) = run_sweep(&dataset, &settings);
        let run = runs.iter().find(|r| r.n_events > 0).expect("some events");
        let written = write_plots(&dir.path().join("plots"), run).unwrap();
        assert_eq!(written.len(), Observables::NAMES.len());
        for path in &written {
            assert!(path.exists());
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"));
        }
    }
}
