use std::path::Path;

use crate::shared::BoxError;

/// Pixel-level facts about a photo file.
pub trait ImageInspector: Send + Sync {
    /// `(width, height)` in pixels.
    fn dimensions(&self, image_path: &Path) -> Result<(u32, u32), BoxError>;

    /// Mean per-pixel saturation of the RGB-converted image, in `[0, 1]`.
    fn average_saturation(&self, image_path: &Path) -> Result<f64, BoxError>;
}
