// ============================================================
// Layer 5 — Convolutional Image Encoder
// ============================================================
// Turns a grayscale image into a grid of 256-channel features.
//
//   [batch, 1, H, W]
//       │  4 × (conv3x3 → batch norm → ReLU → max-pool → dropout)
//       ▼
//   [batch, 256, H/16, W/8]
//
// Pooling windows are 2x2, 2x2, 2x2 and 2x1, so height shrinks
// by 16 and width by 8. Images are padded to multiples of these
// strides before they reach the encoder (see data::image), which
// makes the output size ceil(H/16) × ceil(W/8) exactly.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

pub const HEIGHT_REDUCTION: usize = 16;
pub const WIDTH_REDUCTION: usize = 8;

/// Channel count of the encoder output grid
pub const ENCODER_CHANNELS: usize = 256;

/// Grid size produced for an image of the given size
pub fn grid_size(image_height: usize, image_width: usize) -> (usize, usize) {
    (
        image_height.div_ceil(HEIGHT_REDUCTION),
        image_width.div_ceil(WIDTH_REDUCTION),
    )
}

#[derive(Config, Debug)]
pub struct EncoderConfig {
    #[config(default = 1)]
    pub in_channels: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        // (in, out, pool window)
        let stages = [
            (self.in_channels, 64, [2, 2]),
            (64, 128, [2, 2]),
            (128, ENCODER_CHANNELS, [2, 2]),
            (ENCODER_CHANNELS, ENCODER_CHANNELS, [2, 1]),
        ];
        let blocks = stages
            .iter()
            .map(|&(c_in, c_out, pool)| self.build_block(c_in, c_out, pool, device))
            .collect();
        Encoder { blocks }
    }

    fn build_block<B: Backend>(
        &self,
        c_in:   usize,
        c_out:  usize,
        pool:   [usize; 2],
        device: &B::Device,
    ) -> ConvBlock<B> {
        ConvBlock {
            conv: Conv2dConfig::new([c_in, c_out], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            norm:    BatchNormConfig::new(c_out).init(device),
            pool:    MaxPool2dConfig::new(pool).with_strides(pool).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv:    Conv2d<B>,
    pub norm:    BatchNorm<B, 2>,
    pub pool:    MaxPool2d,
    pub dropout: Dropout,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.norm.forward(self.conv.forward(x)));
        self.dropout.forward(self.pool.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub blocks: Vec<ConvBlock<B>>,
}

impl<B: Backend> Encoder<B> {
    /// images: [batch, in_channels, H, W] → [batch, 256, H/16, W/8]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks
            .iter()
            .fold(images, |x, block| block.forward(x))
    }
}
