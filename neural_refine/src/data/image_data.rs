//! Image loading and normalisation for the refiner input.

use std::path::Path;

use burn::prelude::*;
use burn::tensor::TensorData;
use image::imageops::FilterType;
use image::RgbImage;

use crate::error::{NeuralRefineError, Result};

/// Side length images are resized to.
pub const IMAGE_SIZE: u32 = 224;

/// Per-channel mean subtracted after scaling to `[0, 1]`.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviation divided out after mean subtraction.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A normalised RGB image in CHW layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Channel-major values, `3 * height * width` long.
    pub data: Vec<f32>,
    /// Height in pixels.
    pub height: usize,
    /// Width in pixels.
    pub width: usize,
}

impl ImageData {
    /// Wrap CHW values, checking the length.
    pub fn new(data: Vec<f32>, height: usize, width: usize) -> Result<Self> {
        if data.len() != 3 * height * width {
            return Err(NeuralRefineError::InvalidData(format!(
                "image buffer has {} values, expected 3 x {height} x {width}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            height,
            width,
        })
    }

    /// An all-zero image (the normalised mean colour).
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            data: vec![0.0; 3 * height * width],
            height,
            width,
        }
    }

    /// Scale to `[0, 1]`, normalise per channel and lay out as CHW.
    pub fn from_rgb(img: &RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let (width, height) = (width as usize, height as usize);
        let plane = width * height;

        let mut data = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in img.enumerate_pixels() {
            let base = y as usize * width + x as usize;
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                data[c * plane + base] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }

        Self {
            data,
            height,
            width,
        }
    }

    /// Load an image file, resize it to `size x size` and normalise it.
    pub fn load(path: impl AsRef<Path>, size: u32) -> Result<Self> {
        let img = image::open(path.as_ref())?
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();
        Ok(Self::from_rgb(&img))
    }

    /// Upload as a `[1, 3, H, W]` tensor.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        Tensor::from_data(
            TensorData::new(self.data.clone(), [1, 3, self.height, self.width]),
            device,
        )
    }
}
