use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use crate::features::domain::scene_embedder::SceneEmbedder;
use crate::shared::onnx_model::{l2_normalize, OnnxModel};
use crate::shared::BoxError;

const DEFAULT_INPUT_SIZE: u32 = 224;

/// CLIP image normalization, per RGB channel.
const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// CLIP-style image encoder on ONNX Runtime.
///
/// Shorter side resized to the model input, center-cropped square, output
/// L2-normalized.
pub struct OnnxSceneEmbedder {
    model: OnnxModel,
    input_size: u32,
}

impl OnnxSceneEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let model = OnnxModel::load(model_path)?;
        let input_size = model.input_size().unwrap_or(DEFAULT_INPUT_SIZE);
        Ok(Self { model, input_size })
    }
}

impl SceneEmbedder for OnnxSceneEmbedder {
    fn embed(&self, image_path: &Path) -> Result<Vec<f32>, BoxError> {
        let image = image::open(image_path)?.to_rgb8();
        let mut embedding = self.model.run(preprocess(&image, self.input_size))?.data;
        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

fn preprocess(image: &RgbImage, size: u32) -> Array4<f32> {
    let square = center_square(image, size);
    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in square.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }
    tensor
}

/// Resize so the shorter side is `size`, then crop the centered square.
fn center_square(image: &RgbImage, size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let scale = size as f64 / width.min(height).max(1) as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(size);
    let new_height = ((height as f64 * scale).round() as u32).max(size);
    let resized = imageops::resize(image, new_width, new_height, FilterType::CatmullRom);
    let x = (new_width - size) / 2;
    let y = (new_height - size) / 2;
    imageops::crop_imm(&resized, x, y, size, size).to_image()
}
