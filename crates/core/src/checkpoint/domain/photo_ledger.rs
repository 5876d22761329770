use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::features::domain::photo_record::PhotoRecord;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0} is already recorded")]
    AlreadyProcessed(String),
}

/// Append-only record of processed photos.
///
/// The processed-path set is derived from the records themselves, so every
/// processed path has exactly one record and vice versa.
#[derive(Clone, Debug, Default)]
pub struct PhotoLedger {
    records: Vec<PhotoRecord>,
    processed: HashSet<String>,
}

impl PhotoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger, rejecting a second record for the same path.
    pub fn from_records(records: Vec<PhotoRecord>) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for record in records {
            ledger.insert(record)?;
        }
        Ok(ledger)
    }

    pub fn insert(&mut self, record: PhotoRecord) -> Result<(), LedgerError> {
        if !self.processed.insert(record.filepath.clone()) {
            return Err(LedgerError::AlreadyProcessed(record.filepath));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.processed.contains(path.to_string_lossy().as_ref())
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[PhotoRecord] {
        &self.records
    }

    /// Processed paths, sorted for stable output.
    pub fn processed_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.processed.iter().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
