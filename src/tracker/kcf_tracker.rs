//! OpenCV KCF correlation-filter tracker.

use opencv::core::{self, Ptr};
use opencv::prelude::*;
use opencv::tracking::{TrackerKCF, TrackerKCF_Params};
use tracing::debug;

use crate::error::LprError;
use crate::frame::Frame;
use crate::geometry::{BoundingBox, Rect};

use super::single_object::{SingleObjectTracker, TrackerUpdate};

/// Plate tracker backed by `cv::TrackerKCF`.
///
/// A fresh KCF instance is created on every `init`. Once an update fails the
/// tracker is dropped and every later update fails too.
#[derive(Default)]
pub struct KcfTracker {
    tracker: Option<Ptr<TrackerKCF>>,
}

impl KcfTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cv_rect(b: &BoundingBox) -> core::Rect {
    core::Rect::new(b.x1, b.y1, b.width(), b.height())
}

impl SingleObjectTracker for KcfTracker {
    fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<(), LprError> {
        self.tracker = None;
        let b = bbox.clip(frame.width(), frame.height()).ok_or_else(|| {
            LprError::TrackerInit(format!(
                "box {bbox:?} outside {}x{} frame",
                frame.width(),
                frame.height()
            ))
        })?;

        let mat = frame.to_bgr_mat()?;
        let mut tracker = TrackerKCF::create(TrackerKCF_Params::default()?)?;
        tracker
            .init(&mat, cv_rect(&b))
            .map_err(|err| LprError::TrackerInit(err.to_string()))?;
        self.tracker = Some(tracker);
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> TrackerUpdate {
        let Some(tracker) = self.tracker.as_mut() else {
            return TrackerUpdate::failure();
        };

        let mut found = core::Rect::default();
        let tracked = frame
            .to_bgr_mat()
            .and_then(|mat| tracker.update(&mat, &mut found).map_err(LprError::from));
        match tracked {
            Ok(true) => TrackerUpdate::success(Rect::new(
                found.x as f32,
                found.y as f32,
                found.width as f32,
                found.height as f32,
            )),
            Ok(false) => {
                debug!(frame = frame.index(), "kcf lost target");
                self.tracker = None;
                TrackerUpdate::failure()
            }
            Err(err) => {
                debug!(frame = frame.index(), error = %err, "kcf update failed");
                self.tracker = None;
                TrackerUpdate::failure()
            }
        }
    }
}
