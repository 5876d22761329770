use std::path::Path;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::BoxError;

/// An identity embedding tagged with the face location it was computed for.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceEmbedding {
    pub location: BoundingBox,
    pub embedding: Vec<f32>,
}

/// Domain interface for computing face identity embeddings.
///
/// Each returned embedding names the input location it belongs to; callers
/// join on that location rather than on list position.
pub trait FaceEncoder: Send + Sync {
    fn encode(
        &self,
        image_path: &Path,
        locations: &[BoundingBox],
    ) -> Result<Vec<FaceEmbedding>, BoxError>;
}
