use std::path::PathBuf;

use thiserror::Error;

use crate::checkpoint::domain::checkpoint::Checkpoint;
use crate::checkpoint::domain::photo_ledger::LedgerError;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checkpoint at {path} is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode checkpoint: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("checkpoint is inconsistent: {0}")]
    Invariant(#[from] LedgerError),
}

/// Durable storage for pipeline progress. Single writer.
pub trait CheckpointStore: Send {
    /// `Ok(None)` when no checkpoint has been written yet.
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Replaces the stored checkpoint atomically.
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Deletes the stored checkpoint, if any.
    fn clear(&self) -> Result<(), CheckpointError>;
}
