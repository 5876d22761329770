use std::path::Path;

use crate::features::domain::photo_record::PhotoHashes;
use crate::shared::BoxError;

/// Computes the pHash/dHash pair used for near-duplicate detection.
pub trait PerceptualHasher: Send + Sync {
    fn hash(&self, image_path: &Path) -> Result<PhotoHashes, BoxError>;
}
