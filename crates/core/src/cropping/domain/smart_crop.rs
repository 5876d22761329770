use crate::cropping::domain::aspect_ratio::AspectRatio;
use crate::cropping::domain::crop_result::{CropBox, CropMethod, CropResult};
use crate::detection::domain::detection::Detection;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_HEADROOM_RATIO;

/// Confidence reported when no subject was detected.
pub const SALIENCY_CONFIDENCE: f64 = 0.3;

/// Fraction of crop height used as slack above and below the best face.
const FACE_TOP_BUFFER: f64 = 0.1;
const FACE_BOTTOM_REACH: f64 = 0.9;

/// Where a person's head sits inside its box, and where it should land
/// inside the crop (both as fractions from the top).
const PERSON_HEAD_OFFSET: f64 = 0.2;
const PERSON_HEAD_TARGET: f64 = 0.2;
const PERSON_MIN_HEADROOM: f64 = 0.05;
const PERSON_FALLBACK_HEADROOM: f64 = 0.1;

/// People-first crop placement: faces, then persons, then the image center.
///
/// The crop is always the largest rectangle of the requested ratio that fits
/// the image; only its position depends on the detections.
#[derive(Clone, Debug)]
pub struct SmartCropSolver {
    headroom_ratio: f64,
}

impl SmartCropSolver {
    pub fn new(headroom_ratio: f64) -> Self {
        Self { headroom_ratio }
    }

    pub fn solve(
        &self,
        ratio: AspectRatio,
        faces: &[Detection],
        persons: &[Detection],
        image_width: u32,
        image_height: u32,
    ) -> CropResult {
        let frame = Frame::new(ratio, image_width, image_height);

        if let Some(best) = Detection::best(faces) {
            return self.face_crop(&frame, best, faces);
        }
        if let Some(best) = Detection::best(persons) {
            return person_crop(&frame, best);
        }
        center_crop(&frame)
    }

    fn face_crop(&self, frame: &Frame, best: &Detection, faces: &[Detection]) -> CropResult {
        let face = best.bbox;
        let (cw, ch) = (frame.crop_width as f64, frame.crop_height as f64);
        let headroom = (face.height as f64 * self.headroom_ratio) as i64;

        // Anchor on the group of faces when there are several, so nobody is
        // cut out just because a different face scored best.
        let (anchor_x, anchor_y) = match BoundingBox::enclosing(faces.iter().map(|f| &f.bbox)) {
            Some(group) if faces.len() > 1 => (
                (group.x as f64 + group.right() as f64) / 2.0,
                (group.y as f64 + group.bottom() as f64) / 2.0,
            ),
            _ => face.center(),
        };
        let ideal_x = anchor_x - cw / 2.0;
        let ideal_y = anchor_y - headroom as f64 - ch / 2.0;

        let crop_x = clamp(ideal_x as i64, 0, frame.max_x());

        let face_top = face.y as i64 - headroom;
        let min_y = (face_top as f64 - ch * FACE_TOP_BUFFER).max(0.0);
        let max_y = (face.bottom() as f64 - ch * FACE_BOTTOM_REACH).min(frame.max_y() as f64);
        let ideal_y = ideal_y as i64;
        let crop_y = if (ideal_y as f64) < min_y {
            min_y as i64
        } else if (ideal_y as f64) > max_y {
            max_y as i64
        } else {
            ideal_y
        };
        let crop_y = clamp(crop_y, 0, frame.max_y());

        // Centering on the group or on the headroom-shifted center can still
        // push the best face out; slide back just enough to contain it.
        let crop_x = contain(
            crop_x,
            face.x as i64,
            face.right(),
            frame.crop_width,
            frame.max_x(),
        );
        let crop_y = contain(
            crop_y,
            face.y as i64,
            face.bottom(),
            frame.crop_height,
            frame.max_y(),
        );

        CropResult {
            crop_box: frame.crop_box(crop_x, crop_y),
            confidence: best.confidence * best.quality_score,
            method: CropMethod::Face,
            reason: format!(
                "Cropped around {} face(s), centered on highest quality face",
                faces.len()
            ),
        }
    }
}

impl Default for SmartCropSolver {
    fn default() -> Self {
        Self::new(DEFAULT_HEADROOM_RATIO)
    }
}

fn person_crop(frame: &Frame, best: &Detection) -> CropResult {
    let person = best.bbox;
    let (cw, ch) = (frame.crop_width as f64, frame.crop_height as f64);

    let (center_x, _) = person.center();
    let crop_x = clamp((center_x - cw / 2.0) as i64, 0, frame.max_x());

    let person_top = person.y as i64;
    let head_y = person.y as f64 + person.height as f64 * PERSON_HEAD_OFFSET;
    let ideal_y = (head_y - ch * PERSON_HEAD_TARGET) as i64;
    let mut crop_y = clamp(ideal_y, 0, frame.max_y());

    if crop_y >= person_top {
        crop_y = (person_top - (ch * PERSON_MIN_HEADROOM) as i64).max(0);
        crop_y = crop_y.min(frame.max_y());
    }

    if !(crop_y <= person_top && person_top <= crop_y + frame.crop_height as i64) {
        crop_y = (person_top - (ch * PERSON_FALLBACK_HEADROOM) as i64).max(0);
        crop_y = crop_y.min(frame.max_y());
    }

    CropResult {
        crop_box: frame.crop_box(crop_x, crop_y),
        confidence: best.confidence * best.quality_score,
        method: CropMethod::Person,
        reason: "Cropped around person (no faces detected)".to_string(),
    }
}

fn center_crop(frame: &Frame) -> CropResult {
    CropResult {
        crop_box: frame.crop_box(frame.max_x() / 2, frame.max_y() / 2),
        confidence: SALIENCY_CONFIDENCE,
        method: CropMethod::Saliency,
        reason: "No faces or persons detected, using center crop".to_string(),
    }
}

/// Largest `ratio`-shaped rectangle that fits a `width x height` image.
///
/// One side always equals the image side; the other is floored.
pub fn maximal_crop_size(ratio: AspectRatio, width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let (rw, rh) = (ratio.width() as u64, ratio.height() as u64);
    let (w, h) = (width as u64, height as u64);
    // w / h > rw / rh, compared without floating point.
    if w * rh > rw * h {
        let crop_width = (h * rw / rh).min(w);
        (crop_width as u32, height)
    } else {
        let crop_height = (w * rh / rw).min(h);
        (width, crop_height as u32)
    }
}

/// Image and crop dimensions for one solve.
struct Frame {
    crop_width: u32,
    crop_height: u32,
    image_width: u32,
    image_height: u32,
}

impl Frame {
    fn new(ratio: AspectRatio, image_width: u32, image_height: u32) -> Self {
        let (crop_width, crop_height) = maximal_crop_size(ratio, image_width, image_height);
        Self {
            crop_width,
            crop_height,
            image_width,
            image_height,
        }
    }

    fn max_x(&self) -> i64 {
        self.image_width as i64 - self.crop_width as i64
    }

    fn max_y(&self) -> i64 {
        self.image_height as i64 - self.crop_height as i64
    }

    fn crop_box(&self, x: i64, y: i64) -> CropBox {
        CropBox {
            x: clamp(x, 0, self.max_x()) as u32,
            y: clamp(y, 0, self.max_y()) as u32,
            width: self.crop_width,
            height: self.crop_height,
        }
    }
}

fn clamp(value: i64, low: i64, high: i64) -> i64 {
    value.min(high).max(low)
}

/// Shifts a crop span `[start, start + size)` minimally so it covers
/// `[lo, hi)`, when that span fits at all.
fn contain(start: i64, lo: i64, hi: i64, size: u32, max_start: i64) -> i64 {
    let size = size as i64;
    if hi - lo > size {
        return start;
    }
    let shifted = if lo < start {
        lo
    } else if hi > start + size {
        hi - size
    } else {
        start
    };
    clamp(shifted, 0, max_start)
}
