//! YOLO detector on ONNX Runtime, used for both faces and persons.
//!
//! Expects YOLOv8-style output, `[1, features, boxes]` or
//! `[1, boxes, features]`, with rows `[cx, cy, w, h, score, ...]`. For a
//! face model `score` is the face confidence; for a COCO model it is the
//! class-0 ("person") score, so the same parser serves both.

use std::path::Path;

use image::RgbImage;
use ndarray::Array4;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::person_detector::PersonDetector;
use crate::detection::domain::quality::{face_quality_score, person_quality_score};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::onnx_model::OnnxModel;
use crate::shared::BoxError;

/// Fallback input resolution when the model doesn't declare one.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding, YOLO convention.
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Index of the score column in each output row.
const SCORE_COLUMN: usize = 4;

pub struct OnnxYoloDetector {
    model: OnnxModel,
    input_size: u32,
    face_confidence: f64,
}

impl OnnxYoloDetector {
    /// `face_confidence` is the cut-off used when this instance serves as a
    /// [`FaceDetector`]; person detection takes its threshold per call.
    pub fn new(
        model_path: &Path,
        face_confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let model = OnnxModel::load(model_path)?;
        let input_size = model.input_size().unwrap_or(DEFAULT_INPUT_SIZE);
        Ok(Self {
            model,
            input_size,
            face_confidence,
        })
    }

    fn detect_in(
        &self,
        image_path: &Path,
        min_confidence: f64,
        quality: impl Fn(&BoundingBox, f64, u32, u32) -> f64,
    ) -> Result<Vec<Detection>, BoxError> {
        let image = image::open(image_path)?.to_rgb8();
        let (width, height) = image.dimensions();

        let letterbox = Letterbox::fit(width, height, self.input_size);
        let output = self.model.run(letterbox.tensor(&image))?;
        let raw = parse_rows(&output.shape, &output.data, min_confidence)?;
        Ok(to_detections(raw, &letterbox, width, height, quality))
    }
}

/// Back to image coordinates, suppress overlaps, clip and score.
fn to_detections(
    mut raw: Vec<RawBox>,
    letterbox: &Letterbox,
    width: u32,
    height: u32,
    quality: impl Fn(&BoundingBox, f64, u32, u32) -> f64,
) -> Vec<Detection> {
    for b in raw.iter_mut() {
        letterbox.unmap(b);
    }
    nms(&mut raw, NMS_IOU_THRESH)
        .iter()
        .filter_map(|b| {
            let bbox = b.to_bounding_box(width, height)?;
            let score = quality(&bbox, b.confidence, width, height);
            Some(Detection::new(bbox, b.confidence, score))
        })
        .collect()
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, BoxError> {
        self.detect_in(image_path, self.face_confidence, |bbox, _, w, h| {
            face_quality_score(bbox, w, h)
        })
    }
}

impl PersonDetector for OnnxYoloDetector {
    fn detect(
        &self,
        image_path: &Path,
        confidence_threshold: f64,
    ) -> Result<Vec<Detection>, BoxError> {
        self.detect_in(image_path, confidence_threshold, person_quality_score)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Aspect-preserving resize into a square input, centered with padding.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    size: u32,
    scale: f64,
    new_width: u32,
    new_height: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, size: u32) -> Self {
        let target = size as f64;
        let scale = (target / width.max(1) as f64).min(target / height.max(1) as f64);
        let new_width = ((width as f64 * scale).round() as u32).clamp(1, size);
        let new_height = ((height as f64 * scale).round() as u32).clamp(1, size);
        Self {
            size,
            scale,
            new_width,
            new_height,
            pad_x: (size - new_width) / 2,
            pad_y: (size - new_height) / 2,
        }
    }

    /// Nearest-neighbor resize into an NCHW float tensor in `[0, 1]`.
    fn tensor(&self, image: &RgbImage) -> Array4<f32> {
        let size = self.size as usize;
        let mut tensor = Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);
        let (src_w, src_h) = image.dimensions();
        if src_w == 0 || src_h == 0 {
            return tensor;
        }

        for y in 0..self.new_height {
            let src_y = ((y as f64 / self.scale) as u32).min(src_h - 1);
            for x in 0..self.new_width {
                let src_x = ((x as f64 / self.scale) as u32).min(src_w - 1);
                let pixel = image.get_pixel(src_x, src_y);
                let (ty, tx) = ((self.pad_y + y) as usize, (self.pad_x + x) as usize);
                for c in 0..3 {
                    tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
                }
            }
        }
        tensor
    }

    /// Maps a box from model input coordinates back to the source image.
    fn unmap(&self, b: &mut RawBox) {
        let (px, py) = (self.pad_x as f64, self.pad_y as f64);
        b.x1 = (b.x1 - px) / self.scale;
        b.y1 = (b.y1 - py) / self.scale;
        b.x2 = (b.x2 - px) / self.scale;
        b.y2 = (b.y2 - py) / self.scale;
    }
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
struct RawBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl RawBox {
    /// Integer pixel box clipped to the image; `None` when nothing is left.
    fn to_bounding_box(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let (w, h) = (width as f64, height as f64);
        let x1 = self.x1.clamp(0.0, w);
        let y1 = self.y1.clamp(0.0, h);
        let x2 = self.x2.clamp(0.0, w);
        let y2 = self.y2.clamp(0.0, h);
        let bbox = BoundingBox::new(x1 as i32, y1 as i32, (x2 - x1) as i32, (y2 - y1) as i32);
        (bbox.width > 0 && bbox.height > 0).then_some(bbox)
    }
}

/// Reads rows at or above `min_confidence` from either output layout.
fn parse_rows(shape: &[usize], data: &[f32], min_confidence: f64) -> Result<Vec<RawBox>, BoxError> {
    if shape.len() != 3 {
        return Err(format!("unexpected YOLO output shape: {shape:?}").into());
    }
    // [1, features, boxes] when features < boxes.
    let transposed = shape[1] < shape[2];
    let (num_boxes, num_features) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_features <= SCORE_COLUMN || data.len() < num_boxes * num_features {
        return Err(format!("YOLO output too small for shape {shape:?}").into());
    }
    let at = |row: usize, feature: usize| -> f64 {
        let index = if transposed {
            feature * num_boxes + row
        } else {
            row * num_features + feature
        };
        data[index] as f64
    };

    let mut boxes = Vec::new();
    for row in 0..num_boxes {
        let confidence = at(row, SCORE_COLUMN);
        if confidence < min_confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(row, 0), at(row, 1), at(row, 2), at(row, 3));
        boxes.push(RawBox {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            confidence,
        });
    }
    Ok(boxes)
}

/// Greedy NMS: highest confidence first, suppress overlaps above `iou_thresh`.
fn nms(boxes: &mut [RawBox], iou_thresh: f64) -> Vec<RawBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawBox> = Vec::new();
    for candidate in boxes.iter() {
        if keep.iter().all(|k| iou(k, candidate) <= iou_thresh) {
            keep.push(candidate.clone());
        }
    }
    keep
}

fn iou(a: &RawBox, b: &RawBox) -> f64 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}
