//! Neural network configuration types.

use burn::config::Config;

/// Configuration for the convolutional image encoder.
///
/// The encoder is shared between the observed and the rendered image.
#[derive(Config, Debug)]
pub struct ImageEncoderConfig {
    /// Input channels (RGB).
    #[config(default = 3)]
    pub in_channels: usize,

    /// Output channels of each stride-2 convolution.
    #[config(default = "vec![16, 32, 64]")]
    pub channels: Vec<usize>,

    /// Square kernel size.
    #[config(default = 3)]
    pub kernel_size: usize,
}

impl ImageEncoderConfig {
    /// Width of the pooled feature vector.
    pub fn output_dim(&self) -> usize {
        self.channels.last().copied().unwrap_or(self.in_channels)
    }
}

/// Configuration for the pose refiner network.
#[derive(Config, Debug)]
pub struct PoseRefinerConfig {
    /// Image encoder configuration.
    #[config(default = "ImageEncoderConfig::new()")]
    pub encoder: ImageEncoderConfig,

    /// Width of the embedding of the flattened 3x4 input pose.
    #[config(default = 64)]
    pub pose_embedding_dim: usize,

    /// Hidden layer dimensions of the shared trunk.
    #[config(default = "vec![256, 128]")]
    pub hidden_dims: Vec<usize>,

    /// Dropout probability (0.0 = no dropout).
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl Default for PoseRefinerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseRefinerConfig {
    /// Input width of the trunk: both image features plus the pose embedding.
    pub fn trunk_input_dim(&self) -> usize {
        2 * self.encoder.output_dim() + self.pose_embedding_dim
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.encoder.channels.is_empty() {
            return Err("encoder.channels must not be empty".to_string());
        }
        if self.encoder.kernel_size == 0 {
            return Err("encoder.kernel_size must be positive".to_string());
        }
        if self.pose_embedding_dim == 0 {
            return Err("pose_embedding_dim must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err("dropout must be in [0, 1)".to_string());
        }
        Ok(())
    }
}
