//! Saturation-based black-and-white classification.

/// HSV-style saturation of one pixel: `(max - min) / max`, 0 for black.
pub fn pixel_saturation(r: u8, g: u8, b: u8) -> f64 {
    let max = r.max(g).max(b);
    if max == 0 {
        return 0.0;
    }
    let min = r.min(g).min(b);
    (max - min) as f64 / max as f64
}

/// Mean saturation over packed RGB bytes. Empty input yields 0.
pub fn average_saturation(rgb: &[u8]) -> f64 {
    let pixels = rgb.chunks_exact(3);
    let count = pixels.len();
    if count == 0 {
        return 0.0;
    }
    let total: f64 = pixels.map(|p| pixel_saturation(p[0], p[1], p[2])).sum();
    total / count as f64
}

pub fn is_monochrome(average_saturation: f64, threshold: f64) -> bool {
    average_saturation < threshold
}
