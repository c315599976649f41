//! Video frames as seen by the pipeline.

use std::sync::OnceLock;

use image::{GrayImage, RgbImage, imageops};
use ndarray::Array2;

use crate::geometry::BoundingBox;

#[cfg(feature = "opencv-backend")]
mod mat;

/// One decoded RGB frame and its position in the stream.
#[derive(Debug, Clone)]
pub struct Frame {
    index: u64,
    image: RgbImage,
    /// Luma as `[row, column]` floats, built on first use and shared by every tracker.
    luma_plane: OnceLock<Array2<f32>>,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self {
            index,
            image,
            luma_plane: OnceLock::new(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn luma(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    /// Luma plane indexed `[y, x]`, computed once per frame.
    pub fn luma_plane(&self) -> &Array2<f32> {
        self.luma_plane.get_or_init(|| {
            let luma = self.luma();
            Array2::from_shape_fn(
                (luma.height() as usize, luma.width() as usize),
                |(y, x)| luma.get_pixel(x as u32, y as u32)[0] as f32,
            )
        })
    }

    /// Grey-replicated RGB copy of this frame; detectors were trained on colourless plates.
    pub fn desaturated(&self) -> Frame {
        let gray = self.luma();
        let image = RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let v = gray.get_pixel(x, y)[0];
            image::Rgb([v, v, v])
        });
        Frame::new(self.index, image)
    }

    /// Copy out the pixels under `bbox`, clipped to the frame.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<RgbImage> {
        let b = bbox.clip(self.width(), self.height())?;
        Some(
            imageops::crop_imm(
                &self.image,
                b.x1 as u32,
                b.y1 as u32,
                b.width() as u32,
                b.height() as u32,
            )
            .to_image(),
        )
    }
}
