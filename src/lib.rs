//! # diphoton
//!
//! Ad-hoc analysis pipelines over ATLAS open-data collision records: load
//! events from Parquet files, apply di-photon selection cuts, reconstruct the
//! pair kinematics, sweep the transverse-momentum threshold, and write
//! histogram summaries and plots.
//!
//! The pipeline is strictly sequential: [`Dataset`] → [`select_pairs`] →
//! [`reconstruct`] → (looped by [`run_sweep`]) → [`report`]. The only
//! cross-invocation state is the output directory and the [`Ledger`] of
//! already-processed sources.
#![warn(clippy::perf, clippy::style)]

use thiserror::Error;

/// Settings-file parsing and validation.
pub mod config;
/// Methods for loading and generating event data.
pub mod data;
/// Reconstruction of derived observables from a selected photon pair.
pub mod kinematics;
/// The append-only ledger of already-processed sources.
pub mod ledger;
/// Batch and single-source drivers tying the pipeline together.
pub mod pipeline;
/// Serialization of sweep results: summary JSON, stats documents, and plots.
pub mod report;
/// Event selection cuts.
pub mod selection;
/// The transverse-momentum threshold sweep.
pub mod sweep;
/// Histogramming, descriptive statistics, and four-vectors.
pub mod utils;

pub use crate::config::{Binning, Settings};
pub use crate::data::{Dataset, EventData, Photon};
pub use crate::kinematics::{reconstruct, Observables};
pub use crate::ledger::Ledger;
pub use crate::pipeline::AnalysisContext;
pub use crate::selection::{select_pairs, Cuts};
pub use crate::sweep::{run_sweep, SweepRun};
pub use crate::utils::vectors::Vec4;
pub use crate::utils::{Histogram, SummaryStats};

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// The error type used by all `diphoton` internal methods.
///
/// Two kinds of failure are fatal: configuration errors ([`Config`]) abort
/// before any data is fetched, and data-access errors ([`Unreachable`],
/// [`MissingColumn`], and the wrapped IO/Parquet/Arrow variants) abort the
/// current source. In batch mode a data-access failure only skips the
/// failing manifest entry; it is never marked done, so a later invocation
/// retries it.
///
/// [`Config`]: AnalysisError::Config
/// [`Unreachable`]: AnalysisError::Unreachable
/// [`MissingColumn`]: AnalysisError::MissingColumn
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// An alias for [`std::io::Error`].
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    /// An alias for [`parquet::errors::ParquetError`].
    #[error("Parquet Error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),
    /// An alias for [`arrow::error::ArrowError`].
    #[error("Arrow Error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
    /// An alias for [`shellexpand::LookupError`].
    #[error("Failed to expand path: {0}")]
    LookupError(#[from] shellexpand::LookupError<std::env::VarError>),
    /// An alias for [`serde_json::Error`].
    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// A missing or malformed settings file or settings key.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A data source which could not be opened or downloaded.
    #[error("Source '{locator}' is unreachable: {reason}")]
    Unreachable {
        /// The source locator as given by the user.
        locator: String,
        /// Why the source could not be reached.
        reason: String,
    },
    /// An expected column which is absent (or mistyped) in the input file.
    #[error("Expected column '{name}' is missing or has the wrong type in '{path}'")]
    MissingColumn {
        /// The column name that failed lookup.
        name: String,
        /// The file that was being read.
        path: String,
    },
    /// A failure while rendering a histogram plot.
    #[error("Plot rendering failed: {0}")]
    PlotError(String),
    /// A custom fallback error for errors too infrequent to warrant their own
    /// category.
    #[error("{0}")]
    Custom(String),
}
