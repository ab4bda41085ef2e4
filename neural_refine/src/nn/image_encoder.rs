//! Convolutional image encoder.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{PaddingConfig2d, Relu};
use burn::prelude::*;

use crate::config::ImageEncoderConfig;

/// Stride-2 convolution stack followed by global average pooling.
///
/// Works for any input resolution; the output width is the channel count of
/// the last convolution.
#[derive(Module, Debug)]
pub struct ImageEncoder<B: Backend> {
    convs: Vec<Conv2d<B>>,
    pool: AdaptiveAvgPool2d,
    activation: Relu,
}

impl<B: Backend> ImageEncoder<B> {
    /// Create a new encoder from configuration.
    pub fn new(config: &ImageEncoderConfig, device: &B::Device) -> Self {
        let k = config.kernel_size;
        let mut convs = Vec::new();
        let mut in_channels = config.in_channels;

        for &out_channels in &config.channels {
            convs.push(
                Conv2dConfig::new([in_channels, out_channels], [k, k])
                    .with_stride([2, 2])
                    .with_padding(PaddingConfig2d::Explicit(k / 2, k / 2))
                    .init(device),
            );
            in_channels = out_channels;
        }

        Self {
            convs,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            activation: Relu::new(),
        }
    }

    /// Forward pass.
    ///
    /// Input: images of shape [batch, channels, height, width]
    /// Output: features of shape [batch, out_channels]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for conv in &self.convs {
            x = self.activation.forward(conv.forward(x));
        }
        self.pool.forward(x).flatten(1, 3)
    }
}
