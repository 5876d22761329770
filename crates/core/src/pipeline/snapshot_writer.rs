use std::path::PathBuf;

use thiserror::Error;

use crate::clustering::domain::cluster_report::ClusterReport;
use crate::features::domain::photo_record::PhotoRecord;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode photo table: {0}")]
    Csv(#[from] csv::Error),
}

/// Output artifacts consumed outside the pipeline. Every write replaces
/// the previous artifact atomically.
pub trait SnapshotWriter: Send {
    /// Tabular summary plus the full records, always the whole record set.
    fn write_photos(&self, records: &[PhotoRecord]) -> Result<(), SnapshotError>;

    /// Cluster report plus the people list on its own.
    fn write_clusters(&self, report: &ClusterReport) -> Result<(), SnapshotError>;
}
