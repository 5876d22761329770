use std::path::Path;

use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array2;

use crate::features::domain::perceptual_hasher::PerceptualHasher;
use crate::features::domain::photo_record::PhotoHashes;
use crate::shared::BoxError;

const HASH_SIZE: u32 = 8;
const PHASH_SAMPLE_SIZE: u32 = HASH_SIZE * 4;

/// 64-bit dHash and pHash computed with the `image` crate.
///
/// Bits are emitted row-major, most significant first, as 16 hex digits.
pub struct ImagePerceptualHasher;

impl ImagePerceptualHasher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImagePerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PerceptualHasher for ImagePerceptualHasher {
    fn hash(&self, image_path: &Path) -> Result<PhotoHashes, BoxError> {
        let gray = image::open(image_path)?.to_luma8();
        Ok(PhotoHashes {
            phash: to_hex(phash(&gray)),
            dhash: to_hex(dhash(&gray)),
        })
    }
}

/// Difference hash: 9x8 thumbnail, one bit per "right brighter than left".
pub fn dhash(gray: &GrayImage) -> u64 {
    let small = image::imageops::resize(gray, HASH_SIZE + 1, HASH_SIZE, FilterType::Triangle);
    let mut bits = 0u64;
    for y in 0..HASH_SIZE {
        for x in 0..HASH_SIZE {
            let left = small.get_pixel(x, y)[0];
            let right = small.get_pixel(x + 1, y)[0];
            bits = (bits << 1) | u64::from(right > left);
        }
    }
    bits
}

/// Perceptual hash: 32x32 thumbnail, 2-D DCT-II, low-frequency 8x8 block
/// thresholded at its median.
pub fn phash(gray: &GrayImage) -> u64 {
    let n = PHASH_SAMPLE_SIZE as usize;
    let k = HASH_SIZE as usize;
    let small = image::imageops::resize(
        gray,
        PHASH_SAMPLE_SIZE,
        PHASH_SAMPLE_SIZE,
        FilterType::Triangle,
    );

    let pixels = Array2::from_shape_fn((n, n), |(y, x)| {
        small.get_pixel(x as u32, y as u32)[0] as f64
    });
    // Only the first k DCT basis rows are needed for the low-frequency block.
    let basis = Array2::from_shape_fn((k, n), |(freq, i)| {
        (std::f64::consts::PI * freq as f64 * (2 * i + 1) as f64 / (2 * n) as f64).cos()
    });
    let low = basis.dot(&pixels).dot(&basis.t());

    let mut sorted: Vec<f64> = low.iter().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

    low.iter()
        .fold(0u64, |bits, &v| (bits << 1) | u64::from(v > median))
}

pub fn to_hex(bits: u64) -> String {
    format!("{bits:016x}")
}
