//! Licence plate recognition over video frame streams.
//!
//! Each frame is either *detected* (a plate detector finds plates, a character
//! detector reads them, fresh trackers are spawned) or, when the detector finds
//! nothing, *tracked* (surviving trackers supply the plate boxes). Readings with
//! enough glyphs go into a seven-frame window where every left-to-right plate
//! slot is decided by majority vote.
//!
//! Both detectors are opaque [`Inference`] backends; trackers plug in through
//! [`SingleObjectTracker`]. With the `opencv-backend` feature, frames can come
//! from video files or capture devices and plates can be followed with OpenCV's
//! KCF tracker.

pub mod config;
pub mod consensus;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod integration;
pub mod metrics;
pub mod source;
pub mod tracker;

pub use config::{DetectorConfig, PipelineConfig};
pub use consensus::{ConfirmedPlate, ConsensusWindow};
pub use error::LprError;
pub use frame::Frame;
pub use geometry::{BoundingBox, Rect};
pub use integration::{
    CharacterResult, FrameOutcome, FrameResult, FusionMode, Inference, LprPipeline, PlateColor,
    PlateDetection, PlateReading, ReplayInference,
};
pub use metrics::{MetricsSummary, PipelineMetrics};
pub use source::{FrameSource, ImageSequenceSource};
#[cfg(feature = "opencv-backend")]
pub use source::VideoSource;
pub use tracker::{
    SingleObjectTracker, SlotId, TemplateTracker, TrackerRegistry, TrackerUpdate,
};
