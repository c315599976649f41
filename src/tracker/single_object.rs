//! Seam for visual single-object trackers.

use crate::error::LprError;
use crate::frame::Frame;
use crate::geometry::{BoundingBox, Rect};

/// Result of one tracker step: an `ok` flag and the estimated box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerUpdate {
    pub ok: bool,
    pub rect: Rect,
}

impl TrackerUpdate {
    pub fn success(rect: Rect) -> Self {
        Self { ok: true, rect }
    }

    pub fn failure() -> Self {
        Self {
            ok: false,
            rect: Rect::default(),
        }
    }

    /// `ok == false` and an all-zero box both mean the plate was lost.
    pub fn is_failure(&self) -> bool {
        !self.ok || self.rect.is_zero()
    }
}

/// A tracker following one box across frames without re-running detection.
///
/// Implement this to plug a different tracking algorithm into the
/// [`TrackerRegistry`](super::TrackerRegistry).
pub trait SingleObjectTracker {
    /// Start following `bbox` in `frame`.
    fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<(), LprError>;

    /// Estimate the box in the next frame.
    fn update(&mut self, frame: &Frame) -> TrackerUpdate;
}

impl<T: SingleObjectTracker + ?Sized> SingleObjectTracker for Box<T> {
    fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<(), LprError> {
        (**self).init(frame, bbox)
    }

    fn update(&mut self, frame: &Frame) -> TrackerUpdate {
        (**self).update(frame)
    }
}

/// Creates a fresh, uninitialised tracker for every spawned slot.
pub trait TrackerFactory {
    type Tracker: SingleObjectTracker;

    fn create(&mut self) -> Self::Tracker;
}

impl<F, T> TrackerFactory for F
where
    F: FnMut() -> T,
    T: SingleObjectTracker,
{
    type Tracker = T;

    fn create(&mut self) -> T {
        self()
    }
}
