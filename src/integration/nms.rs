//! Confidence filtering and class-aware non-maximum suppression for raw detector rows.

use ndarray::{Array2, ArrayView1};

use crate::error::LprError;
use crate::geometry::Rect;

use super::detector::RAW_BOX_COLUMNS;

/// A detector candidate that survived suppression, still in tensor space.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub rect: Rect,
    pub objectness: f32,
    pub class_confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn score(&self) -> f32 {
        self.objectness * self.class_confidence
    }

    fn from_row(row: ArrayView1<'_, f32>) -> Self {
        let (class_id, class_confidence) = row
            .iter()
            .skip(RAW_BOX_COLUMNS)
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &s)| if s > best.1 { (i, s) } else { best });
        Self {
            rect: Rect::from_xywh(row[0], row[1], row[2], row[3]),
            objectness: row[4],
            class_confidence,
            class_id,
        }
    }
}

/// Filter raw rows by objectness and merge same-class overlaps.
///
/// Candidates are visited by descending `objectness * class_confidence`. Each
/// visited candidate absorbs every remaining candidate of its class whose IoU
/// exceeds `nms_threshold`; the emitted box is the objectness-weighted mean of
/// the absorbed group. Output is in descending score order.
pub fn non_max_suppression(
    raw: &Array2<f32>,
    conf_threshold: f32,
    nms_threshold: f32,
) -> Result<Vec<Detection>, LprError> {
    if raw.nrows() == 0 {
        return Ok(Vec::new());
    }
    if raw.ncols() <= RAW_BOX_COLUMNS {
        return Err(LprError::MalformedOutput {
            expected: RAW_BOX_COLUMNS + 1,
            got: raw.ncols(),
        });
    }

    let mut candidates: Vec<Detection> = raw
        .rows()
        .into_iter()
        .filter(|row| row[4] >= conf_threshold)
        .map(Detection::from_row)
        .collect();
    candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));

    let mut kept = Vec::new();
    while !candidates.is_empty() {
        let head = candidates[0].clone();
        let mut group = Vec::new();
        let mut rest = Vec::new();
        for (i, c) in candidates.into_iter().enumerate() {
            if i == 0 || (c.class_id == head.class_id && head.rect.iou(&c.rect) > nms_threshold) {
                group.push(c);
            } else {
                rest.push(c);
            }
        }
        candidates = rest;

        let weight: f32 = group.iter().map(|d| d.objectness).sum();
        let mut merged = [0.0f32; 4];
        for det in &group {
            for (m, v) in merged.iter_mut().zip(det.rect.to_tlbr()) {
                *m += v * det.objectness;
            }
        }
        let rect = if weight > 0.0 {
            Rect::from_tlbr(
                merged[0] / weight,
                merged[1] / weight,
                merged[2] / weight,
                merged[3] / weight,
            )
        } else {
            head.rect
        };
        kept.push(Detection { rect, ..head });
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::builder::{RawDetectionBuilder, raw_output};

    #[test]
    fn test_overlapping_same_class_merge() {
        let raw = raw_output(vec![
            RawDetectionBuilder::new(3)
                .tlbr(100.0, 100.0, 200.0, 140.0)
                .objectness(0.9)
                .class_score(0, 0.9)
                .build(),
            RawDetectionBuilder::new(3)
                .tlbr(104.0, 100.0, 204.0, 140.0)
                .objectness(0.6)
                .class_score(0, 0.8)
                .build(),
        ])
        .unwrap();

        let kept = non_max_suppression(&raw, 0.5, 0.5).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_id, 0);
        // (100 * 0.9 + 104 * 0.6) / 1.5
        assert!((kept[0].rect.x - 101.6).abs() < 1e-3);
    }

    #[test]
    fn test_different_classes_survive() {
        let raw = raw_output(vec![
            RawDetectionBuilder::new(3)
                .tlbr(100.0, 100.0, 200.0, 140.0)
                .objectness(0.9)
                .class_score(0, 0.9)
                .build(),
            RawDetectionBuilder::new(3)
                .tlbr(100.0, 100.0, 200.0, 140.0)
                .objectness(0.8)
                .class_score(2, 0.9)
                .build(),
        ])
        .unwrap();
        let kept = non_max_suppression(&raw, 0.5, 0.5).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].class_id, 2);
    }

    #[test]
    fn test_low_objectness_filtered() {
        let raw = raw_output(vec![
            RawDetectionBuilder::new(1)
                .xywh(50.0, 50.0, 10.0, 10.0)
                .objectness(0.3)
                .class_score(0, 1.0)
                .build(),
        ])
        .unwrap();
        assert!(non_max_suppression(&raw, 0.5, 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_threshold_one_still_terminates() {
        let raw = raw_output(vec![
            RawDetectionBuilder::new(1)
                .xywh(50.0, 50.0, 10.0, 10.0)
                .objectness(0.9)
                .class_score(0, 1.0)
                .build(),
        ])
        .unwrap();
        assert_eq!(non_max_suppression(&raw, 0.5, 1.0).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_class_columns_rejected() {
        let raw = Array2::zeros((1, 5));
        assert!(non_max_suppression(&raw, 0.5, 0.5).is_err());
    }
}
