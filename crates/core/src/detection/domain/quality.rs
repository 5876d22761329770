//! Subject quality heuristics shared by detector backends.
//!
//! Larger and more central subjects score higher. Scores are in `[0, 1]`.

use crate::shared::bounding_box::BoundingBox;

/// Faces are expected to cover roughly 5–30% of the frame.
const FACE_AREA_FLOOR: f64 = 0.05;
const FACE_AREA_SPAN: f64 = 0.25;

pub fn face_quality_score(bbox: &BoundingBox, image_width: u32, image_height: u32) -> f64 {
    let area_fraction = area_fraction(bbox, image_width, image_height);
    let area_score = ((area_fraction - FACE_AREA_FLOOR) / FACE_AREA_SPAN).clamp(0.0, 1.0);
    area_score * 0.7 + centrality(bbox, image_width, image_height) * 0.3
}

pub fn person_quality_score(
    bbox: &BoundingBox,
    confidence: f64,
    image_width: u32,
    image_height: u32,
) -> f64 {
    let area_score = area_fraction(bbox, image_width, image_height).min(1.0);
    area_score * 0.6 + centrality(bbox, image_width, image_height) * 0.3 + confidence * 0.1
}

fn area_fraction(bbox: &BoundingBox, image_width: u32, image_height: u32) -> f64 {
    let image_area = image_width as f64 * image_height as f64;
    if image_area <= 0.0 {
        return 0.0;
    }
    bbox.area() as f64 / image_area
}

/// `1 - distance` of the box center from the image center, in
/// image-normalized coordinates, floored at zero.
fn centrality(bbox: &BoundingBox, image_width: u32, image_height: u32) -> f64 {
    if image_width == 0 || image_height == 0 {
        return 0.0;
    }
    let (w, h) = (image_width as f64, image_height as f64);
    let (cx, cy) = bbox.center();
    let dx = (cx - w / 2.0) / w;
    let dy = (cy - h / 2.0) / h;
    1.0 - (dx * dx + dy * dy).sqrt().min(1.0)
}
