//! Video files and capture devices decoded through OpenCV.

use std::path::Path;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{CAP_ANY, VideoCapture};
use tracing::{debug, warn};

use crate::error::LprError;
use crate::frame::Frame;

/// Frames decoded from a video file or a live capture device.
///
/// The stream ends when the capture stops delivering frames. A decode error is
/// reported once and ends the stream as well.
pub struct VideoSource {
    capture: VideoCapture,
    next_index: u64,
    finished: bool,
}

impl VideoSource {
    /// Open a video file (or any URL OpenCV's backends accept).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LprError> {
        let path = path.as_ref();
        let name = path
            .to_str()
            .ok_or_else(|| LprError::Video(format!("non UTF-8 path {}", path.display())))?;
        let capture = VideoCapture::from_file(name, CAP_ANY)?;
        Self::from_capture(capture, name)
    }

    /// Open a capture device by its index, e.g. `0` for the first camera.
    pub fn open_device(index: i32) -> Result<Self, LprError> {
        let capture = VideoCapture::new(index, CAP_ANY)?;
        Self::from_capture(capture, &format!("device {index}"))
    }

    fn from_capture(capture: VideoCapture, label: &str) -> Result<Self, LprError> {
        if !capture.is_opened()? {
            return Err(LprError::Video(format!("cannot open {label}")));
        }
        debug!(source = label, "video opened");
        Ok(Self {
            capture,
            next_index: 0,
            finished: false,
        })
    }
}

impl Iterator for VideoSource {
    type Item = Result<Frame, LprError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut mat = Mat::default();
        match self.capture.read(&mut mat) {
            Ok(true) if !mat.empty() => {
                let index = self.next_index;
                self.next_index += 1;
                Some(Frame::from_bgr_mat(index, &mat))
            }
            Ok(_) => {
                debug!(frames = self.next_index, "video ended");
                self.finished = true;
                None
            }
            Err(err) => {
                warn!(frame = self.next_index, error = %err, "video decode failed");
                self.finished = true;
                Some(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_fatal() {
        let path = std::env::temp_dir().join("plate-stream-no-such-video.mp4");
        assert!(matches!(VideoSource::open(&path), Err(LprError::Video(_))));
    }
}
