use indexmap::IndexSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::AnalysisResult;

/// The append-only record of already-processed sources.
///
/// One source identifier per line. The batch driver consults the ledger
/// before processing a manifest entry and appends the identifier only after
/// all of that source's artifacts are written, which makes re-runs after an
/// interruption skip completed work and retry failures.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    done: IndexSet<String>,
}

impl Ledger {
    /// Load a ledger, treating a missing file as empty.
    pub fn load(path: impl Into<PathBuf>) -> AnalysisResult<Self> {
        let path = path.into();
        let done = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => IndexSet::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, done })
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.done.contains(source_id)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Record a source as processed, appending it to the ledger file.
    /// Marking an already-recorded source is a no-op.
    pub fn mark_done(&mut self, source_id: &str) -> AnalysisResult<()> {
        if !self.done.insert(source_id.to_string()) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{source_id}")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(dir.path().join("processed.log")).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("data_A.parquet"));
    }

    #[test]
    fn test_mark_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.log");
        let mut ledger = Ledger::load(&path).unwrap();
        ledger.mark_done("data_A.parquet").unwrap();
        ledger.mark_done("https://opendata.cern.ch/data_B.parquet").unwrap();
        assert_eq!(ledger.len(), 2);

        let reloaded = Ledger::load(&path).unwrap();
        assert!(reloaded.contains("data_A.parquet"));
        assert!(reloaded.contains("https://opendata.cern.ch/data_B.parquet"));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_marking_twice_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.log");
        let mut ledger = Ledger::load(&path).unwrap();
        ledger.mark_done("data_A.parquet").unwrap();
        ledger.mark_done("data_A.parquet").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
