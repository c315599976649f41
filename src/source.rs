//! Sequential frame sources.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::debug;

use crate::error::LprError;
use crate::frame::Frame;

#[cfg(feature = "opencv-backend")]
mod video;
#[cfg(feature = "opencv-backend")]
pub use video::VideoSource;

/// A blocking, strictly ordered stream of frames.
///
/// `None` is end-of-stream; `Some(Err(_))` is a read failure. Both end the processing loop.
pub trait FrameSource: Iterator<Item = Result<Frame, LprError>> {}

impl<T: Iterator<Item = Result<Frame, LprError>>> FrameSource for T {}

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// One run of a file name, split at digit boundaries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NameRun {
    /// Digits without leading zeros, ordered by length first so `10` follows `9`.
    Number(usize, String),
    Text(String),
}

/// Sort key that orders embedded numbers by value: `frame2` before `frame10`.
fn natural_key(path: &Path) -> Vec<NameRun> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut runs = Vec::new();
    let mut chars = name.chars().peekable();
    while let Some(&first) = chars.peek() {
        let digit = first.is_ascii_digit();
        let mut run = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() != digit {
                break;
            }
            run.push(c);
            chars.next();
        }
        if digit {
            let significant = run.trim_start_matches('0').to_string();
            runs.push(NameRun::Number(significant.len(), significant));
        } else {
            runs.push(NameRun::Text(run));
        }
    }
    runs
}

/// Frames stored as still images in a directory, read in natural file name
/// order (numbers compare by value, so zero padding is optional).
pub struct ImageSequenceSource {
    paths: std::vec::IntoIter<PathBuf>,
    next_index: u64,
}

impl ImageSequenceSource {
    /// Open a frame directory. Fails if it cannot be listed or holds no frames.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LprError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(LprError::NoFrames(dir.to_path_buf()));
        }
        // full path breaks ties between `01` and `1`
        paths.sort_by_cached_key(|path| (natural_key(path), path.clone()));
        debug!(count = paths.len(), dir = %dir.display(), "frame sequence opened");

        Ok(Self {
            paths: paths.into_iter(),
            next_index: 0,
        })
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl Iterator for ImageSequenceSource {
    type Item = Result<Frame, LprError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let index = self.next_index;
        self.next_index += 1;

        let frame = ImageReader::open(&path)
            .map_err(LprError::from)
            .and_then(|reader| reader.decode().map_err(LprError::from))
            .map(|image| Frame::new(index, image.to_rgb8()));
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("plate-stream-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_in_name_order() {
        let dir = scratch_dir("seq");
        RgbImage::from_pixel(4, 3, Rgb([1, 2, 3]))
            .save(dir.join("0002.png"))
            .unwrap();
        RgbImage::from_pixel(8, 6, Rgb([1, 2, 3]))
            .save(dir.join("0001.png"))
            .unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(&dir).unwrap();
        assert_eq!(source.remaining(), 2);
        let first = source.next().unwrap().unwrap();
        assert_eq!((first.index(), first.width()), (0, 8));
        let second = source.next().unwrap().unwrap();
        assert_eq!((second.index(), second.width()), (1, 4));
        assert!(source.next().is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unpadded_numbers_in_value_order() {
        let dir = scratch_dir("natural");
        for (name, width) in [("frame10.png", 10), ("frame2.png", 2), ("frame1.jpg", 1)] {
            RgbImage::new(width, 1).save(dir.join(name)).unwrap();
        }

        let widths: Vec<u32> = ImageSequenceSource::open(&dir)
            .unwrap()
            .map(|frame| frame.unwrap().width())
            .collect();
        assert_eq!(widths, vec![1, 2, 10]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_natural_key_ordering() {
        let key = |name: &str| natural_key(Path::new(name));
        assert!(key("frame9.png") < key("frame10.png"));
        assert!(key("frame0009.png") < key("frame10.png"));
        assert!(key("a100.png") < key("b2.png"));
        assert_eq!(key("007.png"), key("7.png"));
    }

    #[test]
    fn test_empty_directory_is_fatal() {
        let dir = scratch_dir("empty");
        assert!(matches!(
            ImageSequenceSource::open(&dir),
            Err(LprError::NoFrames(_))
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
