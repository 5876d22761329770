use std::path::Path;

use crate::features::domain::image_inspector::ImageInspector;
use crate::features::domain::monochrome;
use crate::shared::BoxError;

/// Reads dimensions and pixel statistics with the `image` crate.
///
/// Dimensions come from the header only; saturation decodes the full image.
pub struct ImageProbe;

impl ImageProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageInspector for ImageProbe {
    fn dimensions(&self, image_path: &Path) -> Result<(u32, u32), BoxError> {
        let (width, height) = image::image_dimensions(image_path)?;
        if width == 0 || height == 0 {
            return Err(format!("image has zero size: {width}x{height}").into());
        }
        Ok((width, height))
    }

    fn average_saturation(&self, image_path: &Path) -> Result<f64, BoxError> {
        let rgb = image::open(image_path)?.to_rgb8();
        Ok(monochrome::average_saturation(rgb.as_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn save_rgb(dir: &Path, name: &str, w: u32, h: u32, pixel: [u8; 3]) -> std::path::PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(w, h, image::Rgb(pixel))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_dimensions_from_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_rgb(dir.path(), "a.png", 40, 30, [10, 20, 30]);

        assert_eq!(ImageProbe::new().dimensions(&path).unwrap(), (40, 30));
    }

    #[test]
    fn test_gray_image_has_zero_saturation() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_rgb(dir.path(), "gray.png", 8, 8, [90, 90, 90]);

        assert_relative_eq!(ImageProbe::new().average_saturation(&path).unwrap(), 0.0);
    }

    #[test]
    fn test_red_image_is_fully_saturated() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_rgb(dir.path(), "red.png", 8, 8, [255, 0, 0]);

        assert_relative_eq!(ImageProbe::new().average_saturation(&path).unwrap(), 1.0);
    }

    #[test]
    fn test_non_image_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"plain text").unwrap();

        assert!(ImageProbe::new().dimensions(&path).is_err());
    }
}
