//! Plate colour classes and the per-colour glyph layout rules.

use std::fmt;

use tracing::debug;

use crate::geometry::{AsBoundingBox, BoundingBox, sort_left_to_right};

use super::glyph::{Glyph, GlyphKind};

/// Plate colour class emitted by the plate detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlateColor {
    /// Private vehicles, single row.
    White,
    /// Commercial vehicles, two rows with a region name.
    Yellow,
    /// Older private vehicles, two rows with a region name.
    Green,
}

impl PlateColor {
    pub const ALL: [PlateColor; 3] = [PlateColor::White, PlateColor::Yellow, PlateColor::Green];

    pub fn from_class_id(class_id: usize) -> Option<Self> {
        Self::ALL.get(class_id).copied()
    }

    pub fn class_id(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            PlateColor::White => "white",
            PlateColor::Yellow => "yellow",
            PlateColor::Green => "green",
        }
    }

    pub fn is_two_row(self) -> bool {
        !matches!(self, PlateColor::White)
    }

    fn layout(self) -> &'static [u8] {
        if self.is_two_row() { &TWO_ROW } else { &SINGLE_ROW }
    }
}

impl fmt::Display for PlateColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const D: u8 = 1;
const H: u8 = 1 << 1;
const R: u8 = 1 << 2;

// 12가3456 / 123가4567
const SINGLE_ROW: [u8; 8] = [D, D, D | H, D | H, D, D, D, D];
// 서울12가3456, region optional
const TWO_ROW: [u8; 8] = [R | D, D, D | H, D | H, D, D, D, D];

fn kind_bit(kind: GlyphKind) -> u8 {
    match kind {
        GlyphKind::Digit => D,
        GlyphKind::Syllable => H,
        GlyphKind::Region => R,
    }
}

/// Whether a glyph of `kind` may appear at `position` on a plate of `color`.
pub fn allowed(color: PlateColor, position: usize, kind: GlyphKind) -> bool {
    color
        .layout()
        .get(position)
        .is_some_and(|mask| mask & kind_bit(kind) != 0)
}

/// A recognised glyph and its box inside the plate crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedGlyph {
    pub glyph: Glyph,
    pub bbox: BoundingBox,
}

impl AsBoundingBox for PlacedGlyph {
    fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

/// Put glyphs in reading order: left to right, upper row first on two-row plates.
pub fn reading_order(color: PlateColor, mut glyphs: Vec<PlacedGlyph>) -> Vec<PlacedGlyph> {
    sort_left_to_right(&mut glyphs);
    if !color.is_two_row() || glyphs.len() < 2 {
        return glyphs;
    }

    let centers: Vec<f32> = glyphs
        .iter()
        .map(|g| (g.bbox.y1 + g.bbox.y2) as f32 / 2.0)
        .collect();
    let mean_height =
        glyphs.iter().map(|g| g.bbox.height() as f32).sum::<f32>() / glyphs.len() as f32;
    let (lo, hi) = centers
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    if hi - lo <= mean_height / 2.0 {
        return glyphs;
    }

    let split = (lo + hi) / 2.0;
    let (upper, lower): (Vec<_>, Vec<_>) = glyphs
        .into_iter()
        .zip(centers)
        .partition(|(_, c)| *c < split);
    upper.into_iter().chain(lower).map(|(g, _)| g).collect()
}

/// Drop glyphs whose kind is not allowed at their position for this plate colour.
///
/// Positions are those of the ordered input, so a rejected glyph does not shift
/// the positions of the glyphs after it.
pub fn apply_layout(color: PlateColor, ordered: Vec<PlacedGlyph>) -> Vec<PlacedGlyph> {
    ordered
        .into_iter()
        .enumerate()
        .filter_map(|(position, placed)| {
            if allowed(color, position, placed.glyph.kind) {
                Some(placed)
            } else {
                debug!(%color, position, glyph = placed.glyph.text, "glyph rejected by layout");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::glyph::glyph_for_class;

    fn placed(class_id: usize, x: i32, y: i32) -> PlacedGlyph {
        PlacedGlyph {
            glyph: glyph_for_class(class_id).unwrap(),
            bbox: BoundingBox::new(x, y, x + 10, y + 20),
        }
    }

    fn text(glyphs: &[PlacedGlyph]) -> String {
        glyphs.iter().map(|g| g.glyph.text).collect()
    }

    #[test]
    fn test_white_plate_single_row() {
        // 3 4 가 1 2 5 6 in shuffled order
        let glyphs = vec![
            placed(5, 60, 2),
            placed(3, 0, 0),
            placed(10, 24, 1),
            placed(4, 12, 0),
            placed(1, 36, 0),
            placed(2, 48, 1),
            placed(6, 72, 0),
        ];
        let ordered = reading_order(PlateColor::White, glyphs);
        assert_eq!(text(&ordered), "34가1256");
        assert_eq!(text(&apply_layout(PlateColor::White, ordered)), "34가1256");
    }

    #[test]
    fn test_white_rejects_region_and_misplaced_syllable() {
        let glyphs = vec![
            placed(50, 0, 0), // 서울 not allowed on white
            placed(10, 12, 0), // syllable at position 1 not allowed
            placed(1, 24, 0),
        ];
        let ordered = reading_order(PlateColor::White, glyphs);
        assert_eq!(text(&apply_layout(PlateColor::White, ordered)), "1");
    }

    #[test]
    fn test_yellow_plate_reads_upper_row_first() {
        // upper row: 서울 1 2, lower row: 바 3 4 5 6
        let glyphs = vec![
            placed(43, 0, 40),
            placed(3, 14, 40),
            placed(4, 28, 40),
            placed(5, 42, 40),
            placed(6, 56, 40),
            placed(50, 10, 0),
            placed(1, 30, 0),
            placed(2, 42, 0),
        ];
        let ordered = reading_order(PlateColor::Yellow, glyphs);
        assert_eq!(text(&ordered), "서울12바3456");
        assert_eq!(apply_layout(PlateColor::Yellow, ordered).len(), 8);
    }

    #[test]
    fn test_positions_past_table_dropped() {
        let glyphs: Vec<PlacedGlyph> = (0..10).map(|i| placed(1, i * 12, 0)).collect();
        assert_eq!(apply_layout(PlateColor::Green, glyphs).len(), 8);
    }

    #[test]
    fn test_color_class_ids() {
        assert_eq!(PlateColor::from_class_id(1), Some(PlateColor::Yellow));
        assert_eq!(PlateColor::Green.class_id(), 2);
        assert!(PlateColor::from_class_id(3).is_none());
    }
}
