//! Conversions between [`Frame`] and OpenCV's BGR `Mat`.

use image::RgbImage;
use opencv::core::{self, Mat};
use opencv::imgproc;
use opencv::prelude::*;

use crate::error::LprError;

use super::Frame;

impl Frame {
    /// Wrap a decoded 8-bit BGR capture.
    pub fn from_bgr_mat(index: u64, mat: &Mat) -> Result<Self, LprError> {
        if mat.typ() != core::CV_8UC3 {
            return Err(LprError::Video(format!(
                "expected 8-bit 3-channel frame, got mat type {}",
                mat.typ()
            )));
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            mat,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;

        let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
        let data = rgb.data_bytes()?.to_vec();
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| LprError::Video(format!("{width}x{height} frame buffer is short")))?;
        Ok(Frame::new(index, image))
    }

    /// BGR copy of this frame for OpenCV algorithms.
    pub fn to_bgr_mat(&self) -> Result<Mat, LprError> {
        let flat = Mat::from_slice(self.image().as_raw().as_slice())?;
        let rgb = flat.reshape(3, self.height() as i32)?;

        let mut bgr = Mat::default();
        imgproc::cvt_color(
            &rgb,
            &mut bgr,
            imgproc::COLOR_RGB2BGR,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;
        Ok(bgr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_channel_order_swapped() {
        let frame = Frame::new(7, RgbImage::from_pixel(5, 4, Rgb([200, 100, 10])));
        let bgr = frame.to_bgr_mat().unwrap();
        assert_eq!((bgr.cols(), bgr.rows()), (5, 4));
        assert_eq!(&bgr.data_bytes().unwrap()[..3], &[10, 100, 200]);

        let back = Frame::from_bgr_mat(8, &bgr).unwrap();
        assert_eq!(back.index(), 8);
        assert_eq!(back.image(), frame.image());
    }

    #[test]
    fn test_rejects_single_channel() {
        let gray = Mat::new_rows_cols_with_default(4, 4, core::CV_8UC1, core::Scalar::all(0.0))
            .unwrap();
        assert!(matches!(
            Frame::from_bgr_mat(0, &gray),
            Err(LprError::Video(_))
        ));
    }
}
