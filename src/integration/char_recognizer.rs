//! Character detector adapter: plate crop in, ordered and layout-checked glyphs out.

use std::fmt;
use std::time::Instant;

use image::RgbImage;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::error::LprError;
use crate::geometry::{BoundingBox, Letterbox};
use crate::metrics::Timed;

use super::detector::Inference;
use super::glyph::{glyph_for_class, parse_plate_text};
use super::layout::{PlacedGlyph, PlateColor, apply_layout, reading_order};
use super::nms::non_max_suppression;

/// Glyphs read from one plate crop, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterResult {
    color: PlateColor,
    glyphs: Vec<PlacedGlyph>,
}

impl CharacterResult {
    pub fn new(color: PlateColor, glyphs: Vec<PlacedGlyph>) -> Self {
        Self { color, glyphs }
    }

    /// Build a result from known plate text. Glyph boxes are left empty.
    pub fn from_text(color: PlateColor, text: &str) -> Option<Self> {
        let glyphs = parse_plate_text(text)?
            .into_iter()
            .map(|glyph| PlacedGlyph {
                glyph,
                bbox: BoundingBox::default(),
            })
            .collect();
        Some(Self { color, glyphs })
    }

    pub fn color(&self) -> PlateColor {
        self.color
    }

    pub fn glyphs(&self) -> &[PlacedGlyph] {
        &self.glyphs
    }

    /// Glyph count; a region name counts once.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.glyph.text).collect()
    }
}

impl fmt::Display for CharacterResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for g in &self.glyphs {
            f.write_str(g.glyph.text)?;
        }
        Ok(())
    }
}

pub struct CharacterRecognizer<I> {
    inference: I,
    config: DetectorConfig,
}

impl<I: Inference> CharacterRecognizer<I> {
    pub fn new(inference: I, config: DetectorConfig) -> Self {
        Self { inference, config }
    }

    /// Read the characters on an already cropped plate image.
    ///
    /// The result may hold fewer glyphs than the detector found: unknown
    /// classes and glyphs the colour layout forbids are dropped.
    pub fn recognize(
        &mut self,
        plate: &RgbImage,
        color: PlateColor,
    ) -> Result<Timed<CharacterResult>, LprError> {
        let (width, height) = plate.dimensions();
        if width == 0 || height == 0 {
            return Err(LprError::InvalidGeometry(format!(
                "empty plate crop {width}x{height}"
            )));
        }
        let letterbox = Letterbox::new(self.config.input_size, width, height);
        let tensor = letterbox.tensorize(plate);

        let start = Instant::now();
        let raw = self.inference.infer(&tensor).map_err(LprError::inference)?;
        let detections = non_max_suppression(
            &raw,
            self.config.conf_threshold,
            self.config.nms_threshold,
        )?;
        let elapsed = start.elapsed();

        let placed: Vec<PlacedGlyph> = detections
            .into_iter()
            .filter_map(|det| {
                let Some(glyph) = glyph_for_class(det.class_id) else {
                    debug!(class_id = det.class_id, "no glyph for character class");
                    return None;
                };
                let bbox = BoundingBox::clipped(&letterbox.to_frame(&det.rect), width, height)?;
                Some(PlacedGlyph { glyph, bbox })
            })
            .collect();

        let glyphs = apply_layout(color, reading_order(color, placed));
        Ok(Timed::new(CharacterResult::new(color, glyphs), elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::builder::{RawDetectionBuilder, raw_output};
    use crate::integration::detector::ReplayInference;
    use crate::integration::glyph::GLYPH_CLASSES;

    fn char_row(class_id: usize, x: f32) -> Vec<f32> {
        RawDetectionBuilder::new(GLYPH_CLASSES)
            .tlbr(x, 180.0, x + 30.0, 236.0)
            .objectness(0.95)
            .class_score(class_id, 0.9)
            .build()
    }

    #[test]
    fn test_recognize_white_plate() {
        // crop is 416x416 so detector space equals crop space; rows arrive unsorted
        let classes = [(3, 150.0), (1, 10.0), (10, 90.0), (2, 50.0), (4, 190.0), (5, 230.0), (6, 270.0)];
        let raw = raw_output(classes.iter().map(|&(c, x)| char_row(c, x)).collect()).unwrap();
        let mut recognizer =
            CharacterRecognizer::new(ReplayInference::new([raw]), DetectorConfig::default());

        let plate = RgbImage::new(416, 416);
        let result = recognizer
            .recognize(&plate, PlateColor::White)
            .unwrap()
            .into_inner();
        assert_eq!(result.text(), "12가3456");
        assert_eq!(result.len(), 7);
        assert_eq!(result.to_string(), "12가3456");
    }

    #[test]
    fn test_layout_can_shorten_result() {
        // a region glyph on a white plate is dropped
        let classes = [(50, 10.0), (1, 50.0), (2, 90.0)];
        let raw = raw_output(classes.iter().map(|&(c, x)| char_row(c, x)).collect()).unwrap();
        let mut recognizer =
            CharacterRecognizer::new(ReplayInference::new([raw]), DetectorConfig::default());
        let result = recognizer
            .recognize(&RgbImage::new(416, 416), PlateColor::White)
            .unwrap()
            .into_inner();
        assert_eq!(result.text(), "12");
    }

    #[test]
    fn test_from_text() {
        let result = CharacterResult::from_text(PlateColor::Green, "경기12가3456").unwrap();
        assert_eq!(result.len(), 8);
        assert_eq!(result.text(), "경기12가3456");
    }
}
