//! Builder for raw detector rows, used by backends and recorded replays.

use ndarray::Array2;

use crate::error::LprError;

use super::detector::rows_to_array;

/// Builder for one raw candidate row `[cx, cy, w, h, objectness, class scores...]`.
#[derive(Debug, Clone, Default)]
pub struct RawDetectionBuilder {
    cx: f32,
    cy: f32,
    w: f32,
    h: f32,
    objectness: f32,
    class_scores: Vec<f32>,
}

impl RawDetectionBuilder {
    pub fn new(num_classes: usize) -> Self {
        Self {
            class_scores: vec![0.0; num_classes],
            ..Self::default()
        }
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.w = x2 - x1;
        self.h = y2 - y1;
        self.cx = x1 + self.w / 2.0;
        self.cy = y1 + self.h / 2.0;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.cx = cx;
        self.cy = cy;
        self.w = w;
        self.h = h;
        self
    }

    pub fn objectness(mut self, objectness: f32) -> Self {
        self.objectness = objectness;
        self
    }

    /// Set the score of one class. Grows the class vector when needed.
    pub fn class_score(mut self, class_id: usize, score: f32) -> Self {
        if class_id >= self.class_scores.len() {
            self.class_scores.resize(class_id + 1, 0.0);
        }
        self.class_scores[class_id] = score;
        self
    }

    pub fn build(self) -> Vec<f32> {
        let mut row = vec![self.cx, self.cy, self.w, self.h, self.objectness];
        row.extend(self.class_scores);
        row
    }
}

/// Stack built rows into the matrix an [`Inference`](super::Inference) backend returns.
pub fn raw_output(rows: Vec<Vec<f32>>) -> Result<Array2<f32>, LprError> {
    rows_to_array(&rows)
}
