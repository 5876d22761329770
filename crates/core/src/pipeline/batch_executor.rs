use std::path::PathBuf;
use std::sync::Arc;

use crate::features::feature_extractor::{ExtractedPhoto, ExtractionError, FeatureExtractor};

pub type PhotoOutcome = Result<ExtractedPhoto, ExtractionError>;

/// Runs feature extraction over one batch of photos.
///
/// Returns exactly one outcome per input path, in input order. A failing
/// photo never prevents its siblings from being attempted.
pub trait BatchExecutor: Send {
    fn execute(&self, extractor: &Arc<FeatureExtractor>, batch: &[PathBuf]) -> Vec<PhotoOutcome>;
}
