use std::path::Path;

use crate::shared::BoxError;

/// Produces an L2-normalized scene embedding for a photo.
///
/// Dimensionality is model-defined but must be constant within a run.
pub trait SceneEmbedder: Send + Sync {
    fn embed(&self, image_path: &Path) -> Result<Vec<f32>, BoxError>;
}
