use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle as reported by detectors.
///
/// Coordinates are signed: detectors may report boxes that spill past the
/// image edge, and the crop solver works in signed arithmetic before
/// clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Widened so extreme detector boxes cannot overflow.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// True when `other` lies entirely inside `self` (edges inclusive).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Smallest box enclosing every box in `boxes`, or `None` when empty.
    pub fn enclosing<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> Option<BoundingBox> {
        let mut iter = boxes.into_iter();
        let first = iter.next()?;
        let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.right(), first.bottom());
        for b in iter {
            x1 = x1.min(b.x);
            y1 = y1.min(b.y);
            x2 = x2.max(b.right());
            y2 = y2.max(b.bottom());
        }
        Some(BoundingBox::new(
            x1,
            y1,
            saturating_extent(x2 - x1 as i64),
            saturating_extent(y2 - y1 as i64),
        ))
    }
}

fn saturating_extent(extent: i64) -> i32 {
    i32::try_from(extent).unwrap_or(if extent < 0 { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_edges_and_area() {
        let b = BoundingBox::new(10, 20, 30, 40);
        assert_eq!(b.right(), 40);
        assert_eq!(b.bottom(), 60);
        assert_eq!(b.area(), 1200);
    }

    #[test]
    fn test_extreme_box_edges_do_not_overflow() {
        let b = BoundingBox::new(i32::MAX, i32::MAX - 1, i32::MAX, 10);
        assert_eq!(b.right(), 2 * i32::MAX as i64);
        assert_eq!(b.bottom(), i32::MAX as i64 + 9);
        assert!(!BoundingBox::new(0, 0, 100, 100).contains(&b));
    }

    #[test]
    fn test_enclosing_saturates_huge_extent() {
        let boxes = [BoundingBox::new(i32::MIN, 0, 1, 1), BoundingBox::new(i32::MAX - 1, 0, 1, 1)];
        let group = BoundingBox::enclosing(&boxes).unwrap();
        assert_eq!(group.x, i32::MIN);
        assert_eq!(group.width, i32::MAX);
    }

    #[test]
    fn test_negative_extent_has_zero_area() {
        assert_eq!(BoundingBox::new(0, 0, -5, 10).area(), 0);
    }

    #[test]
    fn test_center() {
        let (cx, cy) = BoundingBox::new(0, 0, 5, 10).center();
        assert_relative_eq!(cx, 2.5);
        assert_relative_eq!(cy, 5.0);
    }

    #[test]
    fn test_contains_inclusive_edges() {
        let outer = BoundingBox::new(0, 0, 100, 100);
        assert!(outer.contains(&BoundingBox::new(0, 0, 100, 100)));
        assert!(outer.contains(&BoundingBox::new(10, 10, 20, 20)));
        assert!(!outer.contains(&BoundingBox::new(90, 90, 20, 20)));
    }

    #[test]
    fn test_enclosing_spans_all_boxes() {
        let boxes = [BoundingBox::new(10, 50, 20, 20), BoundingBox::new(60, 5, 10, 10)];
        let group = BoundingBox::enclosing(&boxes).unwrap();
        assert_eq!(group, BoundingBox::new(10, 5, 60, 65));
    }

    #[test]
    fn test_enclosing_empty_is_none() {
        assert!(BoundingBox::enclosing(&[]).is_none());
    }

    #[test]
    fn test_serializes_with_plain_field_names() {
        let json = serde_json::to_string(&BoundingBox::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"width":3,"height":4}"#);
    }
}
