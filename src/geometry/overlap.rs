//! Duplicate removal and stable reading order for image-space boxes.

use tracing::debug;

use super::AsBoundingBox;

/// Default overlap ratio above which two plate boxes are considered the same plate.
pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.5;

/// Drop every item whose box overlaps an already kept item by more than `threshold`.
///
/// Items are expected in `(x1, y1)` order; the earlier item wins a conflict.
/// The output keeps input order, so running it twice changes nothing.
pub fn deduplicate<T: AsBoundingBox>(items: Vec<T>, threshold: f32) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let bbox = item.bounding_box();
        let duplicate = kept
            .iter()
            .any(|k| k.bounding_box().overlap_ratio(&bbox) > threshold);
        if duplicate {
            debug!(?bbox, "dropping overlapping box");
        } else {
            kept.push(item);
        }
    }
    kept
}

/// Sort by `(x1, y1)`, the order [`deduplicate`] expects.
pub fn sort_for_dedup<T: AsBoundingBox>(items: &mut [T]) {
    items.sort_by_key(|item| {
        let b = item.bounding_box();
        (b.x1, b.y1, b.x2, b.y2)
    });
}

/// Left to right by `x1`, used for glyphs and per-frame plate results.
pub fn sort_left_to_right<T: AsBoundingBox>(items: &mut [T]) {
    sort_for_dedup(items);
}

/// Top to bottom, then left to right, used for plates within one frame.
pub fn sort_reading_order<T: AsBoundingBox>(items: &mut [T]) {
    items.sort_by_key(|item| {
        let b = item.bounding_box();
        (b.y1, b.x1, b.y2, b.x2)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn boxes() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(10, 10, 110, 40),
            BoundingBox::new(14, 12, 112, 42),
            BoundingBox::new(300, 5, 380, 30),
            BoundingBox::new(20, 200, 120, 230),
            BoundingBox::new(305, 8, 330, 20),
        ]
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let mut input = boxes();
        sort_for_dedup(&mut input);
        let kept = deduplicate(input, DEFAULT_OVERLAP_THRESHOLD);
        assert_eq!(
            kept,
            vec![
                BoundingBox::new(10, 10, 110, 40),
                BoundingBox::new(20, 200, 120, 230),
                BoundingBox::new(300, 5, 380, 30),
            ]
        );
    }

    #[test]
    fn test_deduplicate_is_idempotent() {
        let mut input = boxes();
        sort_for_dedup(&mut input);
        let once = deduplicate(input, DEFAULT_OVERLAP_THRESHOLD);
        let twice = deduplicate(once.clone(), DEFAULT_OVERLAP_THRESHOLD);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_passes_through() {
        let kept: Vec<BoundingBox> = deduplicate(Vec::new(), DEFAULT_OVERLAP_THRESHOLD);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_reading_order_ignores_permutation() {
        let mut expected = boxes();
        sort_reading_order(&mut expected);
        assert_eq!(expected[0], BoundingBox::new(300, 5, 380, 30));
        assert_eq!(expected[4], BoundingBox::new(20, 200, 120, 230));

        let mut reversed = boxes();
        reversed.reverse();
        sort_reading_order(&mut reversed);
        assert_eq!(reversed, expected);

        let mut rotated = boxes();
        rotated.rotate_left(2);
        sort_reading_order(&mut rotated);
        assert_eq!(rotated, expected);
    }

    #[test]
    fn test_left_to_right() {
        let mut items = boxes();
        sort_left_to_right(&mut items);
        let xs: Vec<i32> = items.iter().map(|b| b.x1).collect();
        assert_eq!(xs, vec![10, 14, 20, 300, 305]);
    }
}
