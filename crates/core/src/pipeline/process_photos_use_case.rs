use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::checkpoint::domain::checkpoint::Checkpoint;
use crate::checkpoint::domain::checkpoint_store::{CheckpointError, CheckpointStore};
use crate::clustering::cluster_engine::ClusterEngine;
use crate::features::feature_extractor::{ExtractionError, FeatureExtractor};
use crate::pipeline::batch_executor::BatchExecutor;
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::snapshot_writer::{SnapshotError, SnapshotWriter};

/// Whether an existing checkpoint is honoured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResumeMode {
    /// Skip every photo already in the checkpoint.
    #[default]
    Resume,
    /// Delete the checkpoint and start from nothing.
    Fresh,
}

/// Conditions that stop a run. Per-photo failures never do.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to save checkpoint: {0}")]
    CheckpointSave(#[source] CheckpointError),
    #[error("failed to delete checkpoint: {0}")]
    CheckpointClear(#[source] CheckpointError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub already_processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records in the checkpoint at the end of the run.
    pub total_records: usize,
    pub clustered: bool,
    pub near_duplicate_clusters: usize,
    pub scene_clusters: usize,
    pub people_clusters: usize,
}

/// Drives extraction over discovered photos in checkpointed batches, then
/// clusters the full record set.
///
/// After every batch the checkpoint and the photo snapshots are rewritten
/// from the whole ledger, so a crash loses at most the batch in progress
/// and a rerun never repeats finished work.
pub struct ProcessPhotosUseCase {
    extractor: Arc<FeatureExtractor>,
    executor: Box<dyn BatchExecutor>,
    checkpoint_store: Box<dyn CheckpointStore>,
    snapshot_writer: Box<dyn SnapshotWriter>,
    logger: Box<dyn PipelineLogger>,
    cluster_engine: ClusterEngine,
    batch_size: usize,
    skip_clustering: bool,
}

impl ProcessPhotosUseCase {
    pub fn new(
        extractor: Arc<FeatureExtractor>,
        executor: Box<dyn BatchExecutor>,
        checkpoint_store: Box<dyn CheckpointStore>,
        snapshot_writer: Box<dyn SnapshotWriter>,
        logger: Box<dyn PipelineLogger>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            executor,
            checkpoint_store,
            snapshot_writer,
            logger,
            cluster_engine: ClusterEngine::new(config.clustering.clone()),
            batch_size: config.batch_size.max(1),
            skip_clustering: config.skip_clustering,
        }
    }

    pub fn execute(
        &mut self,
        photos: &[PathBuf],
        mode: ResumeMode,
    ) -> Result<RunSummary, PipelineError> {
        let mut checkpoint = self.initial_checkpoint(mode)?;

        let mut seen = HashSet::new();
        let (done, pending): (Vec<PathBuf>, Vec<PathBuf>) = photos
            .iter()
            .filter(|p| seen.insert(p.to_path_buf()))
            .cloned()
            .partition(|p| checkpoint.ledger.contains(p));

        let mut summary = RunSummary {
            discovered: photos.len(),
            already_processed: done.len(),
            ..Default::default()
        };
        self.logger.info(&format!(
            "{} photos found, {} already processed, {} to process",
            summary.discovered,
            summary.already_processed,
            pending.len()
        ));

        let batch_count = pending.len().div_ceil(self.batch_size);
        for (batch_index, batch) in pending.chunks(self.batch_size).enumerate() {
            log::debug!("Batch {}/{batch_count}: {} photos", batch_index + 1, batch.len());
            let mut outcomes = self.executor.execute(&self.extractor, batch).into_iter();
            let mut batch_failures = 0;

            for path in batch {
                // A short outcome list counts the missing photos as lost.
                let outcome = outcomes.next().unwrap_or_else(|| {
                    Err(ExtractionError::WorkerLost {
                        path: path.clone(),
                    })
                });
                let inserted = outcome.map_err(|e| e.to_string()).and_then(|extracted| {
                    for timing in &extracted.timings {
                        self.logger.timing(timing.stage, timing.duration_ms);
                    }
                    checkpoint
                        .ledger
                        .insert(extracted.record)
                        .map_err(|e| e.to_string())
                });
                match inserted {
                    Ok(()) => summary.succeeded += 1,
                    Err(e) => {
                        log::warn!("Failed to process {}: {e}", path.display());
                        batch_failures += 1;
                    }
                }
                self.logger
                    .progress(summary.succeeded + summary.failed + batch_failures, pending.len());
            }
            summary.failed += batch_failures;
            self.logger.metric("failed_photos", batch_failures as f64);

            self.persist(&mut checkpoint)?;
        }

        // Snapshots always reflect the full ledger, even when nothing new ran.
        self.persist(&mut checkpoint)?;
        summary.total_records = checkpoint.ledger.len();

        if self.skip_clustering {
            self.logger.info("Clustering skipped");
        } else {
            let report = self.cluster_engine.run(checkpoint.ledger.records());
            self.snapshot_writer.write_clusters(&report)?;
            summary.clustered = true;
            summary.near_duplicate_clusters = report.near_duplicates.len();
            summary.scene_clusters = report.scenes.len();
            summary.people_clusters = report.people.len();
        }

        self.logger.info(&format!(
            "Processed {} photos ({} failed); {} records total",
            summary.succeeded, summary.failed, summary.total_records
        ));
        self.logger.summary();
        Ok(summary)
    }

    fn initial_checkpoint(&self, mode: ResumeMode) -> Result<Checkpoint, PipelineError> {
        match mode {
            ResumeMode::Fresh => {
                self.checkpoint_store
                    .clear()
                    .map_err(PipelineError::CheckpointClear)?;
                log::info!("Starting fresh");
                Ok(Checkpoint::new())
            }
            ResumeMode::Resume => match self.checkpoint_store.load() {
                Ok(Some(checkpoint)) => {
                    log::info!("Resuming with {} processed photos", checkpoint.ledger.len());
                    Ok(checkpoint)
                }
                Ok(None) => Ok(Checkpoint::new()),
                Err(e) => {
                    log::warn!("Ignoring unreadable checkpoint, starting empty: {e}");
                    Ok(Checkpoint::new())
                }
            },
        }
    }

    fn persist(&self, checkpoint: &mut Checkpoint) -> Result<(), PipelineError> {
        checkpoint.stamp(Utc::now());
        self.checkpoint_store
            .save(checkpoint)
            .map_err(PipelineError::CheckpointSave)?;
        self.snapshot_writer.write_photos(checkpoint.ledger.records())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::domain::photo_ledger::tests::record;
    use crate::checkpoint::domain::photo_ledger::LedgerError;
    use crate::clustering::domain::cluster_report::ClusterReport;
    use crate::features::domain::image_inspector::ImageInspector;
    use crate::features::domain::photo_record::PhotoRecord;
    use crate::features::feature_extractor::tests::StubHasher;
    use crate::features::feature_extractor::ExtractionSettings;
    use crate::pipeline::batch_executor::PhotoOutcome;
    use crate::pipeline::infrastructure::sequential_batch_executor::SequentialBatchExecutor;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::BoxError;
    use std::path::Path;
    use std::sync::Mutex;

    // --- Stubs ---

    /// Fails for paths containing "bad"; records every path it sees.
    struct RecordingInspector {
        seen: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl ImageInspector for RecordingInspector {
        fn dimensions(&self, path: &Path) -> Result<(u32, u32), BoxError> {
            self.seen.lock().unwrap().push(path.to_path_buf());
            if path.to_string_lossy().contains("bad") {
                return Err("corrupt".into());
            }
            Ok((1200, 800))
        }

        fn average_saturation(&self, _path: &Path) -> Result<f64, BoxError> {
            Ok(0.3)
        }
    }

    #[derive(Default)]
    struct StoreState {
        stored: Option<Checkpoint>,
        corrupt: bool,
        saves: Vec<usize>,
        cleared: bool,
    }

    struct MemoryStore {
        state: Arc<Mutex<StoreState>>,
    }

    impl CheckpointStore for MemoryStore {
        fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
            let state = self.state.lock().unwrap();
            if state.corrupt {
                return Err(CheckpointError::Invariant(LedgerError::AlreadyProcessed(
                    "x".into(),
                )));
            }
            Ok(state.stored.clone())
        }

        fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
            let mut state = self.state.lock().unwrap();
            state.saves.push(checkpoint.ledger.len());
            state.stored = Some(checkpoint.clone());
            Ok(())
        }

        fn clear(&self) -> Result<(), CheckpointError> {
            let mut state = self.state.lock().unwrap();
            state.stored = None;
            state.cleared = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct WriterState {
        photo_snapshots: Vec<Vec<String>>,
        reports: Vec<ClusterReport>,
    }

    struct RecordingWriter {
        state: Arc<Mutex<WriterState>>,
    }

    impl SnapshotWriter for RecordingWriter {
        fn write_photos(&self, records: &[PhotoRecord]) -> Result<(), SnapshotError> {
            let paths = records.iter().map(|r| r.filepath.clone()).collect();
            self.state.lock().unwrap().photo_snapshots.push(paths);
            Ok(())
        }

        fn write_clusters(&self, report: &ClusterReport) -> Result<(), SnapshotError> {
            self.state.lock().unwrap().reports.push(report.clone());
            Ok(())
        }
    }

    /// Extracts only the first photo of each batch and drops the rest.
    struct TruncatingExecutor;

    impl BatchExecutor for TruncatingExecutor {
        fn execute(
            &self,
            extractor: &Arc<FeatureExtractor>,
            batch: &[PathBuf],
        ) -> Vec<PhotoOutcome> {
            batch.iter().take(1).map(|p| extractor.extract(p)).collect()
        }
    }

    struct Harness {
        seen: Arc<Mutex<Vec<PathBuf>>>,
        store: Arc<Mutex<StoreState>>,
        writer: Arc<Mutex<WriterState>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                seen: Arc::default(),
                store: Arc::default(),
                writer: Arc::default(),
            }
        }

        fn use_case(&self, config: PipelineConfig) -> ProcessPhotosUseCase {
            self.use_case_with(config, Box::new(SequentialBatchExecutor))
        }

        fn use_case_with(
            &self,
            config: PipelineConfig,
            executor: Box<dyn BatchExecutor>,
        ) -> ProcessPhotosUseCase {
            let extractor = FeatureExtractor::new(
                Box::new(RecordingInspector {
                    seen: self.seen.clone(),
                }),
                Box::new(StubHasher),
                ExtractionSettings::default(),
            );
            ProcessPhotosUseCase::new(
                Arc::new(extractor),
                executor,
                Box::new(MemoryStore {
                    state: self.store.clone(),
                }),
                Box::new(RecordingWriter {
                    state: self.writer.clone(),
                }),
                Box::new(NullPipelineLogger),
                &config,
            )
        }

        fn seen_count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/in/{n}"))).collect()
    }

    fn batched(batch_size: usize) -> PipelineConfig {
        PipelineConfig {
            batch_size,
            ..Default::default()
        }
    }

    // --- Tests ---

    #[test]
    fn test_checkpoint_after_every_batch_and_at_end() {
        let harness = Harness::new();
        let photos = paths(&["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);

        let summary = harness
            .use_case(batched(2))
            .execute(&photos, ResumeMode::Resume)
            .unwrap();

        assert_eq!(summary.succeeded, 5);
        assert_eq!(summary.total_records, 5);
        assert_eq!(harness.store.lock().unwrap().saves, vec![2, 4, 5, 5]);
        let writer = harness.writer.lock().unwrap();
        assert_eq!(writer.photo_snapshots.len(), 4);
        assert_eq!(writer.photo_snapshots[0].len(), 2);
    }

    #[test]
    fn test_resume_skips_processed_and_snapshots_full_set() {
        let harness = Harness::new();
        let mut prior = Checkpoint::new();
        prior.ledger.insert(record("/in/a.jpg")).unwrap();
        harness.store.lock().unwrap().stored = Some(prior);

        let summary = harness
            .use_case(batched(10))
            .execute(&paths(&["a.jpg", "b.jpg"]), ResumeMode::Resume)
            .unwrap();

        assert_eq!(summary.already_processed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(*harness.seen.lock().unwrap(), vec![PathBuf::from("/in/b.jpg")]);
        let writer = harness.writer.lock().unwrap();
        assert_eq!(
            writer.photo_snapshots.last().unwrap(),
            &vec!["/in/a.jpg".to_string(), "/in/b.jpg".to_string()]
        );
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let harness = Harness::new();
        let photos = paths(&["a.jpg", "b.jpg", "c.jpg"]);

        harness
            .use_case(batched(2))
            .execute(&photos, ResumeMode::Resume)
            .unwrap();
        let first = harness.store.lock().unwrap().stored.clone().unwrap();
        let seen_after_first = harness.seen_count();

        let summary = harness
            .use_case(batched(2))
            .execute(&photos, ResumeMode::Resume)
            .unwrap();
        let second = harness.store.lock().unwrap().stored.clone().unwrap();

        assert_eq!(harness.seen_count(), seen_after_first);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.already_processed, 3);
        assert_eq!(first.ledger.records(), second.ledger.records());
    }

    #[test]
    fn test_fresh_clears_and_reprocesses() {
        let harness = Harness::new();
        let mut prior = Checkpoint::new();
        prior.ledger.insert(record("/in/a.jpg")).unwrap();
        prior.ledger.insert(record("/in/old.jpg")).unwrap();
        harness.store.lock().unwrap().stored = Some(prior);

        let summary = harness
            .use_case(batched(10))
            .execute(&paths(&["a.jpg"]), ResumeMode::Fresh)
            .unwrap();

        let store = harness.store.lock().unwrap();
        assert!(store.cleared);
        assert_eq!(summary.already_processed, 0);
        assert_eq!(store.saves[0], 1);
        assert_eq!(store.stored.as_ref().unwrap().ledger.len(), 1);
    }

    #[test]
    fn test_failed_photo_not_recorded_and_retried_later() {
        let harness = Harness::new();
        let photos = paths(&["a.jpg", "bad.jpg", "c.jpg"]);

        let summary = harness
            .use_case(batched(10))
            .execute(&photos, ResumeMode::Resume)
            .unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        harness
            .use_case(batched(10))
            .execute(&photos, ResumeMode::Resume)
            .unwrap();
        let seen = harness.seen.lock().unwrap();
        assert_eq!(seen.last().unwrap(), &PathBuf::from("/in/bad.jpg"));
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_corrupt_checkpoint_starts_empty() {
        let harness = Harness::new();
        harness.store.lock().unwrap().corrupt = true;

        let summary = harness
            .use_case(batched(10))
            .execute(&paths(&["a.jpg"]), ResumeMode::Resume)
            .unwrap();

        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn test_duplicate_paths_processed_once() {
        let harness = Harness::new();
        let photos = paths(&["a.jpg", "a.jpg"]);

        let summary = harness
            .use_case(batched(10))
            .execute(&photos, ResumeMode::Resume)
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(harness.seen_count(), 1);
    }

    #[test]
    fn test_duplicate_processed_path_counted_once() {
        let harness = Harness::new();
        let mut prior = Checkpoint::new();
        prior.ledger.insert(record("/in/a.jpg")).unwrap();
        harness.store.lock().unwrap().stored = Some(prior);

        let summary = harness
            .use_case(batched(10))
            .execute(&paths(&["a.jpg", "a.jpg", "b.jpg"]), ResumeMode::Resume)
            .unwrap();

        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.already_processed, 1);
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn test_missing_outcomes_count_as_failures() {
        let harness = Harness::new();
        let photos = paths(&["a.jpg", "b.jpg", "c.jpg"]);

        let summary = harness
            .use_case_with(batched(10), Box::new(TruncatingExecutor))
            .execute(&photos, ResumeMode::Resume)
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        let store = harness.store.lock().unwrap();
        assert_eq!(store.stored.as_ref().unwrap().ledger.len(), 1);
    }

    #[test]
    fn test_clusters_written_from_full_record_set() {
        let harness = Harness::new();

        let summary = harness
            .use_case(batched(1))
            .execute(&paths(&["a.jpg", "b.jpg"]), ResumeMode::Resume)
            .unwrap();

        // Every stub photo hashes identically.
        assert!(summary.clustered);
        assert_eq!(summary.near_duplicate_clusters, 1);
        let writer = harness.writer.lock().unwrap();
        assert_eq!(writer.reports.len(), 1);
        assert_eq!(
            writer.reports[0].near_duplicates[0].photo_filenames,
            vec!["a.jpg", "b.jpg"]
        );
    }

    #[test]
    fn test_skip_clustering() {
        let harness = Harness::new();
        let config = PipelineConfig {
            skip_clustering: true,
            ..Default::default()
        };

        let summary = harness
            .use_case(config)
            .execute(&paths(&["a.jpg"]), ResumeMode::Resume)
            .unwrap();

        assert!(!summary.clustered);
        assert!(harness.writer.lock().unwrap().reports.is_empty());
    }

    #[test]
    fn test_empty_input_still_writes_snapshots() {
        let harness = Harness::new();

        let summary = harness
            .use_case(batched(10))
            .execute(&[], ResumeMode::Resume)
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                clustered: true,
                ..Default::default()
            }
        );
        assert_eq!(harness.store.lock().unwrap().saves, vec![0]);
        assert_eq!(harness.writer.lock().unwrap().photo_snapshots.len(), 1);
    }
}
