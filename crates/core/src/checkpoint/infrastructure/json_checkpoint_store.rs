use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::checkpoint::domain::checkpoint::{Checkpoint, CheckpointDocument};
use crate::checkpoint::domain::checkpoint_store::{CheckpointError, CheckpointStore};
use crate::shared::atomic_write::write_atomic_bytes;
use crate::shared::constants::CHECKPOINT_FILENAME;

/// Stores the checkpoint as pretty-printed JSON, replaced atomically.
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<output_dir>/checkpoint.json`
    pub fn in_dir(output_dir: &Path) -> Self {
        Self::new(output_dir.join(CHECKPOINT_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let document: CheckpointDocument =
            serde_json::from_str(&text).map_err(|source| CheckpointError::Decode {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(Checkpoint::from_document(document)?))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let bytes = serde_json::to_vec_pretty(&checkpoint.to_document())
            .map_err(CheckpointError::Encode)?;
        write_atomic_bytes(&self.path, &bytes).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
