use tracing::warn;

/// Floating point box in TLWH layout, used in detector (tensor) space and by trackers.
///
/// Supports conversion from the two layouts detectors emit:
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
/// - XYWH: Center X, Center Y, Width, Height
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    #[inline]
    pub fn from_xywh(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// All-zero rect, the failure sentinel reported by trackers.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.width == 0.0 && self.height == 0.0
    }

    /// Intersection over Union with another box.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

/// Integer image-space box `(x1, y1, x2, y2)`.
///
/// `x2` and `y2` are exclusive so a box maps directly onto a crop. Boxes built
/// through [`BoundingBox::clipped`] always satisfy `0 <= x1 < x2 <= width` and
/// `0 <= y1 < y2 <= height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Round a float rect to pixels, clip it to the frame and drop it if nothing is left.
    pub fn clipped(rect: &Rect, width: u32, height: u32) -> Option<Self> {
        let [x1, y1, x2, y2] = rect.to_tlbr().map(|v| v.round() as i32);
        let candidate = Self::new(x1, y1, x2, y2);
        let clipped = candidate.clip(width, height);
        if clipped.is_none() {
            warn!(?candidate, width, height, "dropping malformed box");
        }
        clipped
    }

    /// Clip to `[0, width] x [0, height]`; `None` when the result is empty or inverted.
    pub fn clip(&self, width: u32, height: u32) -> Option<Self> {
        let w = width as i32;
        let h = height as i32;
        let clipped = Self {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        };
        (clipped.x1 < clipped.x2 && clipped.y1 < clipped.y2).then_some(clipped)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width().max(0) as i64 * self.height().max(0) as i64
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> i64 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0) as i64;
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0) as i64;
        w * h
    }

    /// Intersection divided by the area of the smaller box.
    ///
    /// A small box fully inside a larger one scores 1.0, which IoU would not.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f32 / smaller as f32
    }

    pub fn to_rect(&self) -> Rect {
        Rect::from_tlbr(
            self.x1 as f32,
            self.y1 as f32,
            self.x2 as f32,
            self.y2 as f32,
        )
    }
}

/// Anything carrying an image-space box, so geometry helpers work on detections directly.
pub trait AsBoundingBox {
    fn bounding_box(&self) -> BoundingBox;
}

impl AsBoundingBox for BoundingBox {
    fn bounding_box(&self) -> BoundingBox {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_xywh() {
        let rect = Rect::from_xywh(25.0, 40.0, 30.0, 40.0);
        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_iou() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);

        // Intersection: 5x5 = 25, union: 100 + 100 - 25 = 175
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-6);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&Rect::new(20.0, 20.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_clip_to_frame() {
        let rect = Rect::from_tlbr(-4.7, 10.2, 130.9, 60.0);
        let bbox = BoundingBox::clipped(&rect, 120, 80).unwrap();
        assert_eq!(bbox, BoundingBox::new(0, 10, 120, 60));
    }

    #[test]
    fn test_clip_drops_inverted_and_outside() {
        assert!(BoundingBox::new(50, 10, 40, 20).clip(100, 100).is_none());
        assert!(BoundingBox::new(120, 10, 140, 20).clip(100, 100).is_none());
        assert!(BoundingBox::clipped(&Rect::from_tlbr(5.0, 5.0, 5.2, 30.0), 100, 100).is_none());
    }

    #[test]
    fn test_overlap_ratio_counts_containment() {
        let outer = BoundingBox::new(0, 0, 100, 40);
        let inner = BoundingBox::new(10, 10, 30, 20);
        assert_eq!(outer.overlap_ratio(&inner), 1.0);
        assert_eq!(outer.overlap_ratio(&BoundingBox::new(200, 0, 210, 10)), 0.0);
    }
}
