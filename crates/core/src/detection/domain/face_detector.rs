use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::shared::BoxError;

/// Domain interface for face detection on a photo file.
///
/// Backends that report no confidence should use `1.0`.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, BoxError>;
}
