//! Plate detector adapter: opaque colour-plate detector in, clean plate boxes out.

use std::time::Instant;

use tracing::warn;

use crate::config::DetectorConfig;
use crate::error::LprError;
use crate::frame::Frame;
use crate::geometry::{
    AsBoundingBox, BoundingBox, Letterbox, deduplicate, sort_for_dedup, sort_reading_order,
};
use crate::metrics::Timed;

use super::detector::Inference;
use super::layout::PlateColor;
use super::nms::non_max_suppression;

/// A plate found in one frame, in frame pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateDetection {
    pub bbox: BoundingBox,
    pub color: PlateColor,
    pub objectness: f32,
    pub class_confidence: f32,
}

impl AsBoundingBox for PlateDetection {
    fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

pub struct PlateDetector<I> {
    inference: I,
    config: DetectorConfig,
    overlap_threshold: f32,
}

impl<I: Inference> PlateDetector<I> {
    pub fn new(inference: I, config: DetectorConfig, overlap_threshold: f32) -> Self {
        Self {
            inference,
            config,
            overlap_threshold,
        }
    }

    /// Detect plates in `frame`.
    ///
    /// Returns deduplicated boxes in reading order (top to bottom, then left to
    /// right). No plates is an empty list, not an error. The elapsed time covers
    /// inference and suppression.
    pub fn detect(&mut self, frame: &Frame) -> Result<Timed<Vec<PlateDetection>>, LprError> {
        let (width, height) = (frame.width(), frame.height());
        let letterbox = Letterbox::new(self.config.input_size, width, height);
        let tensor = letterbox.tensorize(frame.image());

        let start = Instant::now();
        let raw = self.inference.infer(&tensor).map_err(LprError::inference)?;
        let detections = non_max_suppression(
            &raw,
            self.config.conf_threshold,
            self.config.nms_threshold,
        )?;
        let elapsed = start.elapsed();

        let mut plates: Vec<PlateDetection> = detections
            .into_iter()
            .filter_map(|det| {
                let Some(color) = PlateColor::from_class_id(det.class_id) else {
                    warn!(class_id = det.class_id, "unknown plate colour class");
                    return None;
                };
                let bbox = BoundingBox::clipped(&letterbox.to_frame(&det.rect), width, height)?;
                Some(PlateDetection {
                    bbox,
                    color,
                    objectness: det.objectness,
                    class_confidence: det.class_confidence,
                })
            })
            .collect();

        sort_for_dedup(&mut plates);
        let mut plates = deduplicate(plates, self.overlap_threshold);
        sort_reading_order(&mut plates);

        Ok(Timed::new(plates, elapsed))
    }
}
