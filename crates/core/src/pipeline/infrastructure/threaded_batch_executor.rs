use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::features::feature_extractor::{ExtractionError, FeatureExtractor};
use crate::pipeline::batch_executor::{BatchExecutor, PhotoOutcome};

enum WorkerEvent {
    Started(usize),
    Finished(usize, PhotoOutcome),
}

/// Extracts a batch on a pool of worker threads.
///
/// Jobs are pulled from a shared queue, so a slow photo only occupies one
/// worker. With a timeout set, a photo running past it is reported as
/// [`ExtractionError::Timeout`], its worker is abandoned, and a fresh worker
/// takes over the rest of the queue.
pub struct ThreadedBatchExecutor {
    workers: usize,
    photo_timeout: Option<Duration>,
}

impl ThreadedBatchExecutor {
    pub fn new(workers: usize, photo_timeout: Option<Duration>) -> Self {
        Self {
            workers: workers.max(1),
            photo_timeout,
        }
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(&self, extractor: &Arc<FeatureExtractor>, batch: &[PathBuf]) -> Vec<PhotoOutcome> {
        if batch.is_empty() {
            return Vec::new();
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, PathBuf)>();
        for job in batch.iter().cloned().enumerate() {
            // The receiver is alive, so sending cannot fail.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let (event_tx, event_rx) = crossbeam_channel::unbounded::<WorkerEvent>();
        let mut handles: Vec<JoinHandle<()>> = (0..self.workers.min(batch.len()))
            .map(|_| spawn_worker(Arc::clone(extractor), job_rx.clone(), event_tx.clone()))
            .collect();

        // Without a timeout nothing is respawned; dropping our sender lets a
        // dead pool surface as a disconnect instead of a hang.
        let respawn_tx = self.photo_timeout.map(|_| event_tx);

        let mut outcomes: Vec<Option<PhotoOutcome>> = batch.iter().map(|_| None).collect();
        let mut in_flight: HashMap<usize, Instant> = HashMap::new();
        let mut pending = batch.len();
        let mut abandoned = 0;

        while pending > 0 {
            let deadline = self.photo_timeout.and_then(|limit| {
                in_flight.values().min().map(|started| *started + limit)
            });
            let event = match deadline {
                Some(deadline) => match event_rx.recv_deadline(deadline) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match event_rx.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
            };

            match event {
                Some(WorkerEvent::Started(idx)) => {
                    if outcomes[idx].is_none() {
                        in_flight.insert(idx, Instant::now());
                    }
                }
                Some(WorkerEvent::Finished(idx, outcome)) => {
                    in_flight.remove(&idx);
                    if outcomes[idx].is_none() {
                        outcomes[idx] = Some(outcome);
                        pending -= 1;
                    }
                }
                None => {
                    let (Some(limit), Some(tx)) = (self.photo_timeout, respawn_tx.as_ref()) else {
                        continue;
                    };
                    let now = Instant::now();
                    let expired: Vec<usize> = in_flight
                        .iter()
                        .filter(|(_, started)| now.duration_since(**started) >= limit)
                        .map(|(idx, _)| *idx)
                        .collect();
                    for idx in expired {
                        in_flight.remove(&idx);
                        log::warn!(
                            "Abandoning {} after {:.1}s",
                            batch[idx].display(),
                            limit.as_secs_f64()
                        );
                        outcomes[idx] = Some(Err(ExtractionError::Timeout {
                            path: batch[idx].clone(),
                            seconds: limit.as_secs_f64(),
                        }));
                        pending -= 1;
                        abandoned += 1;
                        handles.push(spawn_worker(
                            Arc::clone(extractor),
                            job_rx.clone(),
                            tx.clone(),
                        ));
                    }
                }
            }
        }
        drop(respawn_tx);
        drop(job_rx);

        if abandoned == 0 {
            for handle in handles {
                if handle.join().is_err() {
                    log::warn!("Extraction worker panicked");
                }
            }
        }

        outcomes
            .into_iter()
            .zip(batch)
            .map(|(outcome, path)| {
                outcome.unwrap_or_else(|| Err(ExtractionError::WorkerLost { path: path.clone() }))
            })
            .collect()
    }
}

fn spawn_worker(
    extractor: Arc<FeatureExtractor>,
    jobs: Receiver<(usize, PathBuf)>,
    events: Sender<WorkerEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for (idx, path) in jobs {
            if events.send(WorkerEvent::Started(idx)).is_err() {
                break;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(&path)))
                .unwrap_or_else(|_| {
                    log::warn!("Extraction panicked for {}", path.display());
                    Err(ExtractionError::WorkerLost { path: path.clone() })
                });
            if events.send(WorkerEvent::Finished(idx, outcome)).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::domain::image_inspector::ImageInspector;
    use crate::features::feature_extractor::tests::{base_extractor, StubHasher};
    use crate::features::feature_extractor::ExtractionSettings;
    use crate::shared::BoxError;
    use std::path::Path;

    /// Sleeps for paths containing "slow", panics for "boom", fails for "bad".
    struct ScriptedInspector {
        delay: Duration,
    }

    impl ImageInspector for ScriptedInspector {
        fn dimensions(&self, path: &Path) -> Result<(u32, u32), BoxError> {
            let name = path.to_string_lossy();
            if name.contains("slow") {
                std::thread::sleep(self.delay);
            }
            if name.contains("boom") {
                panic!("decoder exploded");
            }
            if name.contains("bad") {
                return Err("corrupt".into());
            }
            Ok((800, 600))
        }

        fn average_saturation(&self, _path: &Path) -> Result<f64, BoxError> {
            Ok(0.5)
        }
    }

    fn scripted(delay: Duration) -> Arc<FeatureExtractor> {
        Arc::new(FeatureExtractor::new(
            Box::new(ScriptedInspector { delay }),
            Box::new(StubHasher),
            ExtractionSettings::default(),
        ))
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/p/{n}"))).collect()
    }

    #[test]
    fn test_outcomes_follow_input_order() {
        let extractor = Arc::new(base_extractor());
        let batch = paths(&["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);

        let outcomes = ThreadedBatchExecutor::new(3, None).execute(&extractor, &batch);

        let names: Vec<String> = outcomes
            .into_iter()
            .map(|o| o.unwrap().record.filename)
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);
    }

    #[test]
    fn test_failure_does_not_abort_siblings() {
        let extractor = scripted(Duration::ZERO);
        let batch = paths(&["a.jpg", "bad.jpg", "c.jpg"]);

        let outcomes = ThreadedBatchExecutor::new(2, None).execute(&extractor, &batch);

        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(ExtractionError::Image { .. })));
        assert!(outcomes[2].is_ok());
    }

    #[test]
    fn test_panic_becomes_worker_lost() {
        let extractor = scripted(Duration::ZERO);
        let batch = paths(&["boom.jpg", "b.jpg"]);

        let outcomes = ThreadedBatchExecutor::new(1, None).execute(&extractor, &batch);

        assert!(matches!(outcomes[0], Err(ExtractionError::WorkerLost { .. })));
        assert!(outcomes[1].is_ok());
    }

    #[test]
    fn test_slow_photo_times_out_and_rest_complete() {
        let extractor = scripted(Duration::from_secs(5));
        let batch = paths(&["slow.jpg", "b.jpg", "c.jpg"]);
        let started = Instant::now();

        let outcomes = ThreadedBatchExecutor::new(1, Some(Duration::from_millis(100)))
            .execute(&extractor, &batch);

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(matches!(outcomes[0], Err(ExtractionError::Timeout { .. })));
        assert!(outcomes[1].is_ok());
        assert!(outcomes[2].is_ok());
    }

    #[test]
    fn test_fast_batch_unaffected_by_timeout() {
        let extractor = Arc::new(base_extractor());
        let batch = paths(&["a.jpg", "b.jpg"]);

        let outcomes = ThreadedBatchExecutor::new(2, Some(Duration::from_secs(10)))
            .execute(&extractor, &batch);

        assert!(outcomes.iter().all(|o| o.is_ok()));
    }

    #[test]
    fn test_empty_batch() {
        let extractor = Arc::new(base_extractor());
        assert!(ThreadedBatchExecutor::new(4, None).execute(&extractor, &[]).is_empty());
    }

    #[test]
    fn test_zero_workers_clamped() {
        assert_eq!(ThreadedBatchExecutor::new(0, None).workers, 1);
    }
}
