// ============================================================
// Layer 4 — Image Preprocessing
// ============================================================
// Loads score images and brings them into the layout the
// encoder expects:
//
//   any format → 8-bit grayscale → f32 in [0, 1], inverted so
//   white paper is 0.0 and ink is close to 1.0
//
// Inversion makes zero-padding indistinguishable from blank
// paper, so padded batches and stride alignment add no edges.
//
// Sizes are padded up to multiples of the encoder strides
// (16 rows × 8 columns) so the encoder output is exactly
// ceil(H/16) × ceil(W/8).

use anyhow::{Context, Result};
use burn::{prelude::*, tensor::TensorData};
use image::GrayImage;
use std::path::Path;

use crate::ml::encoder::{HEIGHT_REDUCTION, WIDTH_REDUCTION};

/// A single-channel image, row-major, ready to become a tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub pixels: Vec<f32>,
    pub height: usize,
    pub width:  usize,
}

impl PreparedImage {
    /// Read an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("Cannot read image '{}'", path.display()))?;
        Ok(Self::from_luma(&img.to_luma8()))
    }

    pub fn from_luma(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img
            .as_raw()
            .iter()
            .map(|&v| 1.0 - v as f32 / 255.0)
            .collect();
        Self { pixels, height: height as usize, width: width as usize }
    }

    /// Extend with zeros on the bottom and right to `height` × `width`.
    pub fn padded_to(&self, height: usize, width: usize) -> Self {
        assert!(
            height >= self.height && width >= self.width,
            "Cannot pad a {}x{} image down to {height}x{width}",
            self.height, self.width,
        );
        let mut pixels = vec![0.0f32; height * width];
        for (y, row) in self.pixels.chunks(self.width.max(1)).enumerate().take(self.height) {
            pixels[y * width..y * width + self.width].copy_from_slice(row);
        }
        Self { pixels, height, width }
    }

    /// Pad to the next multiple of the encoder strides.
    pub fn aligned_to_strides(&self) -> Self {
        self.padded_to(
            self.height.div_ceil(HEIGHT_REDUCTION) * HEIGHT_REDUCTION,
            self.width.div_ceil(WIDTH_REDUCTION) * WIDTH_REDUCTION,
        )
    }

    /// [1, 1, height, width]
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let data = TensorData::new(self.pixels.clone(), [1, 1, self.height, self.width]);
        Tensor::<B, 4>::from_data(data, device)
    }
}
