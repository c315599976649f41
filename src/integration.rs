//! Integration module connecting opaque detection networks to the recognition pipeline.
//!
//! This module provides the `Inference` seam for detector backends (Burn,
//! recorded replays, ...), the plate and character adapters built on it, the
//! per-frame fusion policy and the `LprPipeline` facade.

mod builder;
mod char_recognizer;
mod detector;
mod fusion;
mod glyph;
mod layout;
mod nms;
mod pipeline;
mod plate_detector;

pub use builder::{RawDetectionBuilder, raw_output};
pub use char_recognizer::{CharacterRecognizer, CharacterResult};
pub use detector::{Inference, RAW_BOX_COLUMNS, ReplayInference, rows_to_array};
pub use fusion::{FrameFusion, FrameResult, FusionMode, PlateReading};
pub use glyph::{GLYPH_CLASSES, Glyph, GlyphKind, glyph_for_class, parse_plate_text};
pub use layout::{PlacedGlyph, PlateColor, allowed, apply_layout, reading_order};
pub use nms::{Detection, non_max_suppression};
pub use pipeline::{FrameOutcome, LprPipeline};
pub use plate_detector::{PlateDetection, PlateDetector};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnInference, BurnInferenceError, BurnModel};
