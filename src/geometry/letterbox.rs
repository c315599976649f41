//! Pad-to-square transform between frame pixels and the square detector input.

use image::{Rgb, RgbImage, imageops};
use ndarray::Array3;

use super::Rect;

/// Letterbox mapping for one source image and one square detector resolution.
///
/// The source is zero-padded on its shorter side (half before, half after),
/// then resized to `input_size x input_size`. [`Letterbox::to_frame`] is the
/// inverse used to bring detector boxes back to source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    input_size: u32,
    width: u32,
    height: u32,
}

impl Letterbox {
    pub fn new(input_size: u32, width: u32, height: u32) -> Self {
        Self {
            input_size,
            width,
            height,
        }
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Source pixels to detector pixels.
    fn scale(&self) -> f32 {
        self.input_size as f32 / self.width.max(self.height).max(1) as f32
    }

    /// Total horizontal and vertical padding, in detector pixels.
    fn padding(&self) -> (f32, f32) {
        let scale = self.scale();
        let pad_x = self.height.saturating_sub(self.width) as f32 * scale;
        let pad_y = self.width.saturating_sub(self.height) as f32 * scale;
        (pad_x, pad_y)
    }

    /// Map a box from detector space back to source pixels.
    pub fn to_frame(&self, rect: &Rect) -> Rect {
        let (pad_x, pad_y) = self.padding();
        let unpad_w = self.input_size as f32 - pad_x;
        let unpad_h = self.input_size as f32 - pad_y;
        let [x1, y1, x2, y2] = rect.to_tlbr();

        let sx = |x: f32| (x - pad_x / 2.0) / unpad_w * self.width as f32;
        let sy = |y: f32| (y - pad_y / 2.0) / unpad_h * self.height as f32;
        Rect::from_tlbr(sx(x1), sy(y1), sx(x2), sy(y2))
    }

    /// Map a box from source pixels into detector space.
    pub fn to_tensor(&self, rect: &Rect) -> Rect {
        let (pad_x, pad_y) = self.padding();
        let unpad_w = self.input_size as f32 - pad_x;
        let unpad_h = self.input_size as f32 - pad_y;
        let [x1, y1, x2, y2] = rect.to_tlbr();

        let tx = |x: f32| x / self.width as f32 * unpad_w + pad_x / 2.0;
        let ty = |y: f32| y / self.height as f32 * unpad_h + pad_y / 2.0;
        Rect::from_tlbr(tx(x1), ty(y1), tx(x2), ty(y2))
    }

    pub fn rescale(&self, rects: &[Rect]) -> Vec<Rect> {
        rects.iter().map(|r| self.to_frame(r)).collect()
    }

    /// Build the CHW detector input: pad to square, nearest resize, scale to `[0, 1]`.
    pub fn tensorize(&self, image: &RgbImage) -> Array3<f32> {
        let side = image.width().max(image.height()).max(1);
        let mut canvas = RgbImage::from_pixel(side, side, Rgb([0, 0, 0]));
        let left = (side - image.width()) / 2;
        let top = (side - image.height()) / 2;
        imageops::replace(&mut canvas, image, left as i64, top as i64);

        let size = self.input_size;
        let resized = imageops::resize(&canvas, size, size, imageops::FilterType::Nearest);

        Array3::from_shape_fn((3, size as usize, size as usize), |(c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        })
    }
}

/// Rescale detector-space boxes produced at `input_size` back to a `width x height` frame.
pub fn rescale(rects: &[Rect], input_size: u32, width: u32, height: u32) -> Vec<Rect> {
    Letterbox::new(input_size, width, height).rescale(rects)
}
