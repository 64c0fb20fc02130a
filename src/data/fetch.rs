//! Source locators and remote materialization.
//!
//! The pipeline only ever sees local paths: a remote source is downloaded
//! into a cache directory first, behind a bounded timeout and a small retry
//! count. Everything downstream of the fetch is testable with in-memory
//! datasets.

use log::{info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{AnalysisError, AnalysisResult};

/// A data-source locator: a local path or an `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Local(PathBuf),
    Remote(String),
}

impl DataSource {
    /// Classify a locator string. `~` and environment variables in local
    /// paths are expanded.
    pub fn parse(locator: &str) -> AnalysisResult<Self> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            Ok(Self::Remote(locator.to_string()))
        } else {
            Ok(Self::Local(PathBuf::from(&*shellexpand::full(locator)?)))
        }
    }

    /// The locator as given (used as the ledger identifier).
    pub fn id(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
        }
    }
}

/// Materializes sources as local files.
///
/// Downloads are blocking with a per-call timeout; a failed download is
/// retried a small, fixed number of times before the source is reported
/// unreachable. Cached downloads are reused.
#[derive(Debug, Clone)]
pub struct Fetcher {
    timeout: Duration,
    attempts: u32,
    cache_dir: PathBuf,
}

impl Fetcher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_ATTEMPTS: u32 = 3;

    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            attempts: Self::DEFAULT_ATTEMPTS,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Resolve a source to a local path, downloading it if necessary.
    pub fn fetch(&self, source: &DataSource) -> AnalysisResult<PathBuf> {
        match source {
            DataSource::Local(path) => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(AnalysisError::Unreachable {
                        locator: path.display().to_string(),
                        reason: "no such file".to_string(),
                    })
                }
            }
            DataSource::Remote(url) => self.download(url),
        }
    }

    fn download(&self, url: &str) -> AnalysisResult<PathBuf> {
        let target = self.cache_dir.join(cache_file_name(url));
        if target.is_file() {
            info!("Using cached copy of {url} at {}", target.display());
            return Ok(target);
        }
        std::fs::create_dir_all(&self.cache_dir)?;
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let mut last_error = String::new();
        for attempt in 1..=self.attempts {
            match self.try_download(&agent, url, &target) {
                Ok(()) => return Ok(target),
                Err(reason) => {
                    warn!("Download attempt {attempt}/{} for {url} failed: {reason}", self.attempts);
                    last_error = reason;
                }
            }
        }
        Err(AnalysisError::Unreachable {
            locator: url.to_string(),
            reason: last_error,
        })
    }

    fn try_download(&self, agent: &ureq::Agent, url: &str, target: &Path) -> Result<(), String> {
        let response = agent.get(url).call().map_err(|err| err.to_string())?;
        // Download into a sibling temp file so an interrupted transfer never
        // leaves a truncated file in the cache.
        let temp = tempfile::NamedTempFile::new_in(
            target.parent().unwrap_or_else(|| Path::new(".")),
        )
        .map_err(|err| err.to_string())?;
        let mut reader = response.into_reader();
        let mut writer = File::create(temp.path()).map_err(|err| err.to_string())?;
        std::io::copy(&mut reader, &mut writer).map_err(|err| err.to_string())?;
        temp.persist(target).map_err(|err| err.to_string())?;
        Ok(())
    }
}

/// A stable cache file name for a URL: its final path segment, or a
/// sanitized form of the whole URL when there is none.
fn cache_file_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let name = name.split(['?', '#']).next().unwrap_or(name);
    if name.is_empty() || name.starts_with("http") {
        url.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_classification() {
        assert!(matches!(
            DataSource::parse("https://opendata.cern.ch/data_A.parquet").unwrap(),
            DataSource::Remote(_)
        ));
        assert!(matches!(
            DataSource::parse("./local/data_A.parquet").unwrap(),
            DataSource::Local(_)
        ));
    }

    #[test]
    fn test_missing_local_file_is_unreachable() {
        let fetcher = Fetcher::new("cache");
        let source = DataSource::Local(PathBuf::from("definitely/not/here.parquet"));
        assert!(matches!(
            fetcher.fetch(&source),
            Err(AnalysisError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_local_file_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.parquet");
        std::fs::write(&path, b"stub").unwrap();
        let fetcher = Fetcher::new(dir.path().join("cache"));
        let source = DataSource::Local(path.clone());
        assert_eq!(fetcher.fetch(&source).unwrap(), path);
    }

    #[test]
    fn test_cache_file_name() {
        assert_eq!(
            cache_file_name("https://opendata.cern.ch/run/data_A.parquet"),
            "data_A.parquet"
        );
        assert_eq!(
            cache_file_name("https://opendata.cern.ch/run/data_A.parquet?token=x"),
            "data_A.parquet"
        );
        assert!(!cache_file_name("https://opendata.cern.ch").is_empty());
    }
}
