use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::shared::BoxError;

/// Domain interface for full-body person detection.
///
/// Implementations return only the "person" class, at or above
/// `confidence_threshold`.
pub trait PersonDetector: Send + Sync {
    fn detect(
        &self,
        image_path: &Path,
        confidence_threshold: f64,
    ) -> Result<Vec<Detection>, BoxError>;
}
