//! Owned color frames.

use image::imageops::{self, FilterType};
use image::{GrayImage, Rgb, RgbImage};

use crate::error::{MediaError, MediaResult};

/// One decoded color frame, RGB with 8 bits per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap a decoded image.
    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from packed `rgb24` bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> MediaResult<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(MediaError::InvalidFrame(format!(
                "expected {} bytes for {}x{} rgb24, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        RgbImage::from_raw(width, height, data)
            .map(Self::from_image)
            .ok_or_else(|| MediaError::InvalidFrame("buffer does not match dimensions".into()))
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self::from_image(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Packed `rgb24` bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Luma conversion.
    pub fn to_gray(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    /// Resize to exact dimensions. Returns a clone when already that size.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        Frame::from_image(imageops::resize(
            &self.image,
            width,
            height,
            FilterType::Triangle,
        ))
    }

    /// Resize both axes by `factor`, keeping at least one pixel.
    pub fn scaled(&self, factor: f32) -> Frame {
        let width = ((self.width() as f32 * factor).round() as u32).max(1);
        let height = ((self.height() as f32 * factor).round() as u32).max(1);
        self.resized(width, height)
    }

    /// Fill a rectangle with one color, clipped to the frame.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: [u8; 3]) {
        let x_end = (x + width).min(self.width());
        let y_end = (y + height).min(self.height());
        for yy in y..y_end {
            for xx in x..x_end {
                self.image.put_pixel(xx, yy, Rgb(color));
            }
        }
    }
}
