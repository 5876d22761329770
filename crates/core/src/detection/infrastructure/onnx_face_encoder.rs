//! ArcFace-style identity encoder on ONNX Runtime.
//!
//! Each face is cropped from the photo, resized to 112x112 and normalized
//! to `[-1, 1]`; the output is L2-normalized so Euclidean distances are
//! comparable across photos.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use crate::detection::domain::face_encoder::{FaceEmbedding, FaceEncoder};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::onnx_model::{l2_normalize, OnnxModel};
use crate::shared::BoxError;

const INPUT_SIZE: u32 = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxFaceEncoder {
    model: OnnxModel,
}

impl OnnxFaceEncoder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            model: OnnxModel::load(model_path)?,
        })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(
        &self,
        image_path: &Path,
        locations: &[BoundingBox],
    ) -> Result<Vec<FaceEmbedding>, BoxError> {
        let image = image::open(image_path)?.to_rgb8();
        let mut embeddings = Vec::with_capacity(locations.len());

        for location in locations {
            let Some(face) = crop_face(&image, location) else {
                log::debug!("Face {location:?} lies outside {}", image_path.display());
                continue;
            };
            let mut embedding = self.model.run(preprocess(&face))?.data;
            l2_normalize(&mut embedding);
            embeddings.push(FaceEmbedding {
                location: *location,
                embedding,
            });
        }
        Ok(embeddings)
    }
}

/// The part of `location` inside the image, or `None` when empty.
fn crop_face(image: &RgbImage, location: &BoundingBox) -> Option<RgbImage> {
    let (width, height) = image.dimensions();
    let x1 = (location.x as i64).clamp(0, width as i64);
    let y1 = (location.y as i64).clamp(0, height as i64);
    let x2 = location.right().clamp(0, width as i64);
    let y2 = location.bottom().clamp(0, height as i64);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    let view = imageops::crop_imm(
        image,
        x1 as u32,
        y1 as u32,
        (x2 - x1) as u32,
        (y2 - y1) as u32,
    );
    Some(view.to_image())
}

/// Resize to 112x112, normalize, NCHW layout.
fn preprocess(face: &RgbImage) -> Array4<f32> {
    let resized = imageops::resize(face, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - NORM_MEAN) / NORM_STD;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;

    #[test]
    fn test_crop_face_clips_to_image() {
        let image = RgbImage::new(100, 80);
        let face = crop_face(&image, &BoundingBox::new(-10, 60, 40, 40)).unwrap();
        assert_eq!(face.dimensions(), (30, 20));
    }

    #[test]
    fn test_crop_face_outside_is_none() {
        let image = RgbImage::new(100, 80);
        assert!(crop_face(&image, &BoundingBox::new(120, 0, 10, 10)).is_none());
        assert!(crop_face(&image, &BoundingBox::new(10, 10, 0, 10)).is_none());
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let face = RgbImage::from_pixel(30, 40, Rgb([255, 0, 127]));
        let tensor = preprocess(&face);

        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        // One u8 step of resampling error is 1/127.5.
        assert_relative_eq!(tensor[[0, 0, 50, 50]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 1, 50, 50]], -1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 2, 50, 50]], 0.0, epsilon = 0.01);
    }
}
