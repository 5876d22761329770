use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::clustering::domain::cluster_report::ClusterReport;
use crate::features::domain::photo_record::PhotoRecord;
use crate::pipeline::snapshot_writer::{SnapshotError, SnapshotWriter};
use crate::shared::atomic_write::write_atomic_bytes;
use crate::shared::constants::{
    CLUSTERS_JSON_FILENAME, PEOPLE_JSON_FILENAME, PHOTOS_JSON_FILENAME, PHOTOS_TABLE_FILENAME,
};

/// One row of `photos.csv`.
#[derive(Serialize)]
struct PhotoRow<'a> {
    filename: &'a str,
    filepath: &'a str,
    width: u32,
    height: u32,
    phash: &'a str,
    dhash: &'a str,
    num_faces: usize,
    num_persons: usize,
    is_monochrome: bool,
}

impl<'a> From<&'a PhotoRecord> for PhotoRow<'a> {
    fn from(record: &'a PhotoRecord) -> Self {
        Self {
            filename: &record.filename,
            filepath: &record.filepath,
            width: record.width,
            height: record.height,
            phash: &record.hashes.phash,
            dhash: &record.hashes.dhash,
            num_faces: record.faces.len(),
            num_persons: record.persons.len(),
            is_monochrome: record.is_monochrome,
        }
    }
}

/// Writes `photos.csv`, `photos.json`, `clusters.json` and `people.json`
/// into the output directory.
pub struct FileSnapshotWriter {
    output_dir: PathBuf,
}

impl FileSnapshotWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn write(&self, filename: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        let path = self.output_dir.join(filename);
        write_atomic_bytes(&path, bytes).map_err(|source| SnapshotError::Io { path, source })
    }
}

impl SnapshotWriter for FileSnapshotWriter {
    fn write_photos(&self, records: &[PhotoRecord]) -> Result<(), SnapshotError> {
        self.write(PHOTOS_TABLE_FILENAME, &photo_table(records, &self.output_dir)?)?;
        self.write(PHOTOS_JSON_FILENAME, &serde_json::to_vec_pretty(records)?)
    }

    fn write_clusters(&self, report: &ClusterReport) -> Result<(), SnapshotError> {
        self.write(CLUSTERS_JSON_FILENAME, &serde_json::to_vec_pretty(report)?)?;
        self.write(PEOPLE_JSON_FILENAME, &serde_json::to_vec_pretty(&report.people)?)
    }
}

fn photo_table(records: &[PhotoRecord], output_dir: &Path) -> Result<Vec<u8>, SnapshotError> {
    let mut writer = csv::Writer::from_writer(vec![]);
    if records.is_empty() {
        writer.write_record([
            "filename",
            "filepath",
            "width",
            "height",
            "phash",
            "dhash",
            "num_faces",
            "num_persons",
            "is_monochrome",
        ])?;
    }
    for record in records {
        writer.serialize(PhotoRow::from(record))?;
    }
    writer.into_inner().map_err(|e| SnapshotError::Io {
        path: output_dir.join(PHOTOS_TABLE_FILENAME),
        source: e.into_error(),
    })
}
