//! Default tracker: Kalman-predicted grayscale template matching.

use ndarray::{Array2, ArrayView2, Zip, s};
use tracing::debug;

use crate::error::LprError;
use crate::frame::Frame;
use crate::geometry::{BoundingBox, Rect};

use super::kalman_filter::{KalmanFilter, KalmanState, measurement};
use super::single_object::{SingleObjectTracker, TrackerUpdate};

/// Tuning for [`TemplateTracker`].
#[derive(Debug, Clone)]
pub struct TemplateTrackerConfig {
    /// Pixels searched around the predicted top-left corner, in each direction.
    pub search_radius: u32,
    /// Best match scores above this (0-255 scale) count as a lost plate.
    pub max_mean_abs_diff: f32,
    /// Weight of the newly matched patch when refreshing the template.
    pub learning_rate: f32,
}

impl Default for TemplateTrackerConfig {
    fn default() -> Self {
        Self {
            search_radius: 16,
            max_mean_abs_diff: 40.0,
            learning_rate: 0.2,
        }
    }
}

/// Follows one plate by matching its initial appearance in later frames.
///
/// Each update predicts the next position with a constant-velocity Kalman
/// filter, then searches a square window around the prediction for the patch
/// with the smallest mean absolute difference to the template. The box keeps
/// the size it was initialised with.
#[derive(Debug, Clone, Default)]
pub struct TemplateTracker {
    config: TemplateTrackerConfig,
    kalman: KalmanFilter,
    state: Option<KalmanState>,
    template: Option<Array2<f32>>,
}

impl TemplateTracker {
    pub fn new(config: TemplateTrackerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn lose(&mut self) -> TrackerUpdate {
        self.state = None;
        self.template = None;
        TrackerUpdate::failure()
    }
}

fn mean_abs_diff(patch: ArrayView2<f32>, template: &Array2<f32>) -> f32 {
    let total = Zip::from(patch)
        .and(template)
        .fold(0.0f32, |acc, a, b| acc + (a - b).abs());
    total / template.len() as f32
}

impl SingleObjectTracker for TemplateTracker {
    fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<(), LprError> {
        let b = bbox.clip(frame.width(), frame.height()).ok_or_else(|| {
            LprError::TrackerInit(format!(
                "box {bbox:?} outside {}x{} frame",
                frame.width(),
                frame.height()
            ))
        })?;

        let luma = frame.luma_plane();
        let template = luma
            .slice(s![b.y1 as usize..b.y2 as usize, b.x1 as usize..b.x2 as usize])
            .to_owned();

        self.state = Some(self.kalman.initiate(measurement(&b.to_rect())));
        self.template = Some(template);
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> TrackerUpdate {
        let (Some(state), Some(template)) = (self.state.as_ref(), self.template.as_ref()) else {
            return TrackerUpdate::failure();
        };

        let (th, tw) = template.dim();
        let predicted = self.kalman.predict(state);
        let (cx, cy) = predicted.rect().center();
        let origin_x = (cx - tw as f32 / 2.0).round() as i64;
        let origin_y = (cy - th as f32 / 2.0).round() as i64;

        let luma = frame.luma_plane();
        let (fh, fw) = luma.dim();
        let radius = self.config.search_radius as i64;

        let mut best: Option<(f32, usize, usize)> = None;
        for dy in -radius..=radius {
            let y = origin_y + dy;
            if y < 0 || y as usize + th > fh {
                continue;
            }
            for dx in -radius..=radius {
                let x = origin_x + dx;
                if x < 0 || x as usize + tw > fw {
                    continue;
                }
                let (x, y) = (x as usize, y as usize);
                let score = mean_abs_diff(luma.slice(s![y..y + th, x..x + tw]), template);
                if best.is_none_or(|(b, _, _)| score < b) {
                    best = Some((score, x, y));
                }
            }
        }

        let Some((score, x, y)) = best else {
            debug!(frame = frame.index(), "template search window left the frame");
            return self.lose();
        };
        if score > self.config.max_mean_abs_diff {
            debug!(frame = frame.index(), score, "template match too weak");
            return self.lose();
        }

        let rect = Rect::new(x as f32, y as f32, tw as f32, th as f32);
        let corrected = self.kalman.update(&predicted, measurement(&rect));

        let rate = self.config.learning_rate;
        let patch = luma.slice(s![y..y + th, x..x + tw]);
        let blended = Zip::from(template)
            .and(&patch)
            .map_collect(|t, p| (1.0 - rate) * t + rate * p);

        self.state = Some(corrected);
        self.template = Some(blended);
        TrackerUpdate::success(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const PLATE_W: u32 = 60;
    const PLATE_H: u32 = 20;

    /// Textured plate on a black background, top-left corner at `(px, py)`.
    fn frame_with_plate(index: u64, px: u32, py: u32) -> Frame {
        let image = RgbImage::from_fn(200, 120, |x, y| {
            if (px..px + PLATE_W).contains(&x) && (py..py + PLATE_H).contains(&y) {
                let v = (((x - px) * 7 + (y - py) * 13) % 200 + 50) as u8;
                Rgb([v, v, v])
            } else {
                Rgb([0, 0, 0])
            }
        });
        Frame::new(index, image)
    }

    fn plate_box(px: u32, py: u32) -> BoundingBox {
        BoundingBox::new(
            px as i32,
            py as i32,
            (px + PLATE_W) as i32,
            (py + PLATE_H) as i32,
        )
    }

    #[test]
    fn test_follows_moving_plate() {
        let mut tracker = TemplateTracker::default();
        tracker
            .init(&frame_with_plate(0, 40, 50), plate_box(40, 50))
            .unwrap();

        for step in 1..=4u32 {
            let (px, py) = (40 + 4 * step, 50 + step);
            let update = tracker.update(&frame_with_plate(step as u64, px, py));
            assert!(!update.is_failure());
            assert_eq!(update.rect, plate_box(px, py).to_rect());
        }
    }

    #[test]
    fn test_reports_failure_when_plate_disappears() {
        let mut tracker = TemplateTracker::default();
        tracker
            .init(&frame_with_plate(0, 40, 50), plate_box(40, 50))
            .unwrap();

        let empty = Frame::new(1, RgbImage::new(200, 120));
        assert!(tracker.update(&empty).is_failure());
        // lost trackers stay lost
        assert!(tracker.update(&frame_with_plate(2, 40, 50)).is_failure());
    }

    #[test]
    fn test_uninitialised_and_bad_init() {
        let mut tracker = TemplateTracker::default();
        assert!(tracker.update(&frame_with_plate(0, 0, 0)).is_failure());

        let err = tracker
            .init(&frame_with_plate(0, 0, 0), BoundingBox::new(300, 10, 320, 20))
            .unwrap_err();
        assert!(matches!(err, LprError::TrackerInit(_)));
    }
}
