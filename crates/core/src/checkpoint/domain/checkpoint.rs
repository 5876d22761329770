use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::domain::photo_ledger::{LedgerError, PhotoLedger};
use crate::features::domain::photo_record::PhotoRecord;

/// Pipeline progress: the ledger of processed photos plus when it was last
/// persisted.
#[derive(Clone, Debug, Default)]
pub struct Checkpoint {
    pub ledger: PhotoLedger,
    pub last_updated: Option<DateTime<Utc>>,
}

/// On-disk checkpoint document.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointDocument {
    #[serde(default)]
    pub processed_files: Vec<String>,
    #[serde(default)]
    pub results: Vec<PhotoRecord>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub total_processed: usize,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }

    pub fn to_document(&self) -> CheckpointDocument {
        CheckpointDocument {
            processed_files: self.ledger.processed_paths(),
            results: self.ledger.records().to_vec(),
            last_updated: self.last_updated.map(|t| t.to_rfc3339()),
            total_processed: self.ledger.len(),
        }
    }

    /// Rebuilds a checkpoint. `results` is authoritative: listed paths
    /// without a record are dropped and will be processed again.
    pub fn from_document(document: CheckpointDocument) -> Result<Self, LedgerError> {
        let listed = document.processed_files.len();
        let ledger = PhotoLedger::from_records(document.results)?;
        if listed != ledger.len() {
            log::warn!(
                "Checkpoint lists {listed} processed files but holds {} results; keeping results",
                ledger.len()
            );
        }
        Ok(Self {
            ledger,
            last_updated: document.last_updated.as_deref().and_then(parse_timestamp),
        })
    }
}

/// Accepts RFC 3339 and offset-less ISO-8601 timestamps (read as UTC).
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
