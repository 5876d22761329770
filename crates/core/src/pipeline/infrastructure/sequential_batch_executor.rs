use std::path::PathBuf;
use std::sync::Arc;

use crate::features::feature_extractor::FeatureExtractor;
use crate::pipeline::batch_executor::{BatchExecutor, PhotoOutcome};

/// Extracts photos one after another on the calling thread. No timeout.
pub struct SequentialBatchExecutor;

impl BatchExecutor for SequentialBatchExecutor {
    fn execute(&self, extractor: &Arc<FeatureExtractor>, batch: &[PathBuf]) -> Vec<PhotoOutcome> {
        batch.iter().map(|path| extractor.extract(path)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::feature_extractor::tests::base_extractor;

    #[test]
    fn test_one_outcome_per_path_in_order() {
        let extractor = Arc::new(base_extractor());
        let batch = vec![PathBuf::from("/p/b.jpg"), PathBuf::from("/p/a.jpg")];

        let outcomes = SequentialBatchExecutor.execute(&extractor, &batch);

        let names: Vec<String> = outcomes
            .into_iter()
            .map(|o| o.unwrap().record.filename)
            .collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg"]);
    }

    #[test]
    fn test_empty_batch() {
        let extractor = Arc::new(base_extractor());
        assert!(SequentialBatchExecutor.execute(&extractor, &[]).is_empty());
    }
}
