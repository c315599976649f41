//! Box types and the geometric steps between detector output and the pipeline.

mod letterbox;
mod overlap;
mod rect;

pub use letterbox::{Letterbox, rescale};
pub use overlap::{
    DEFAULT_OVERLAP_THRESHOLD, deduplicate, sort_for_dedup, sort_left_to_right,
    sort_reading_order,
};
pub use rect::{AsBoundingBox, BoundingBox, Rect};
