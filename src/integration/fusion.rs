//! Per-frame policy choosing between fresh detections and tracker fallback.

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::frame::Frame;
use crate::geometry::{AsBoundingBox, BoundingBox, sort_left_to_right};
use crate::metrics::PipelineMetrics;
use crate::tracker::{SlotId, SlotUpdate, TrackerFactory, TrackerRegistry};

use super::char_recognizer::{CharacterRecognizer, CharacterResult};
use super::detector::Inference;
use super::layout::PlateColor;
use super::plate_detector::PlateDetector;

/// Which branch produced a frame's readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionMode {
    /// The plate detector found at least one plate; trackers were respawned.
    TrustDetections,
    /// No detections; readings come from the surviving trackers.
    FallbackTracking,
}

/// A confirmed-length reading of one plate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateReading {
    pub bbox: BoundingBox,
    pub characters: CharacterResult,
    /// Tracker slot following this plate, if one could be started or was used.
    pub slot_id: Option<SlotId>,
}

impl PlateReading {
    pub fn text(&self) -> String {
        self.characters.text()
    }

    pub fn color(&self) -> PlateColor {
        self.characters.color()
    }
}

impl AsBoundingBox for PlateReading {
    fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

/// Readings of one frame, left to right by `x1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameResult {
    readings: Vec<PlateReading>,
}

impl FrameResult {
    pub fn new(mut readings: Vec<PlateReading>) -> Self {
        sort_left_to_right(&mut readings);
        Self { readings }
    }

    pub fn readings(&self) -> &[PlateReading] {
        &self.readings
    }

    pub fn into_readings(self) -> Vec<PlateReading> {
        self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Owns both detector adapters and the tracker registry and applies the
/// detect-or-track policy to each frame.
pub struct FrameFusion<P, C, F: TrackerFactory> {
    plate_detector: PlateDetector<P>,
    recognizer: CharacterRecognizer<C>,
    registry: TrackerRegistry<F>,
    min_confirmed_chars: usize,
    desaturate: bool,
}

impl<P, C, F> FrameFusion<P, C, F>
where
    P: Inference,
    C: Inference,
    F: TrackerFactory,
{
    pub fn new(plate: P, character: C, trackers: F, config: &PipelineConfig) -> Self {
        Self {
            plate_detector: PlateDetector::new(plate, config.plate, config.overlap_threshold),
            recognizer: CharacterRecognizer::new(character, config.character),
            registry: TrackerRegistry::new(trackers),
            min_confirmed_chars: config.min_confirmed_chars,
            desaturate: config.desaturate,
        }
    }

    /// Process one frame.
    ///
    /// Never fails: a failed detector, recogniser or tracker call only drops
    /// that box's contribution. Latencies are recorded into `metrics`.
    pub fn fuse(&mut self, frame: &Frame, metrics: &mut PipelineMetrics) -> (FusionMode, FrameResult) {
        let working: Cow<'_, Frame> = if self.desaturate {
            Cow::Owned(frame.desaturated())
        } else {
            Cow::Borrowed(frame)
        };

        let detections = match self.plate_detector.detect(&working) {
            Ok(timed) => {
                metrics.record_plate(timed.elapsed);
                timed.into_inner()
            }
            Err(err) => {
                warn!(frame = frame.index(), error = %err, "plate detection failed");
                Vec::new()
            }
        };

        let mut readings = Vec::new();
        if !detections.is_empty() {
            // tracker identity restarts whenever the detector sees plates
            self.registry.clear();
            for detection in &detections {
                let slot_id = match self.registry.spawn(detection, &working) {
                    Ok(slot_id) => Some(slot_id),
                    Err(err) => {
                        warn!(frame = frame.index(), bbox = ?detection.bbox, error = %err, "tracker spawn failed");
                        None
                    }
                };
                if let Some(characters) =
                    self.read_plate(&working, detection.bbox, detection.color, metrics)
                {
                    readings.push(PlateReading {
                        bbox: detection.bbox,
                        characters,
                        slot_id,
                    });
                }
            }
            return (FusionMode::TrustDetections, FrameResult::new(readings));
        }

        for (slot_id, update) in self.registry.update_all(&working) {
            let SlotUpdate::Active(bbox) = update else {
                continue;
            };
            if let Some(characters) = self.read_plate(&working, bbox, slot_id.color(), metrics) {
                readings.push(PlateReading {
                    bbox,
                    characters,
                    slot_id: Some(slot_id),
                });
            }
        }
        (FusionMode::FallbackTracking, FrameResult::new(readings))
    }

    /// Crop and recognise one plate; `None` unless the reading is long enough.
    fn read_plate(
        &mut self,
        frame: &Frame,
        bbox: BoundingBox,
        color: PlateColor,
        metrics: &mut PipelineMetrics,
    ) -> Option<CharacterResult> {
        let Some(crop) = frame.crop(&bbox) else {
            debug!(frame = frame.index(), ?bbox, "plate box outside frame");
            return None;
        };

        let characters = match self.recognizer.recognize(&crop, color) {
            Ok(timed) => {
                metrics.record_char(timed.elapsed);
                timed.into_inner()
            }
            Err(err) => {
                warn!(frame = frame.index(), ?bbox, error = %err, "character recognition failed");
                return None;
            }
        };

        if characters.len() < self.min_confirmed_chars {
            debug!(
                frame = frame.index(),
                text = %characters,
                glyphs = characters.len(),
                "reading too short"
            );
            return None;
        }
        Some(characters)
    }

    pub fn registry(&self) -> &TrackerRegistry<F> {
        &self.registry
    }
}
