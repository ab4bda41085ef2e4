//! Pose refiner network and the interface the trainer drives.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use super::image_encoder::ImageEncoder;
use super::mlp::{Mlp, MlpConfig};
use crate::config::PoseRefinerConfig;

/// Raw network outputs for a batch.
#[derive(Debug, Clone)]
pub struct RefinerOutput<B: Backend> {
    /// Planar translation, `[batch, 2]`.
    pub xy: Tensor<B, 2>,
    /// Depth translation, `[batch, 1]`.
    pub z: Tensor<B, 2>,
    /// Rotation quaternion `[x, y, z, w]`, `[batch, 4]`, not normalised.
    pub rotation: Tensor<B, 2>,
}

/// A network that predicts a refined pose from an image pair and a pose.
///
/// The trainer only depends on this trait, so any module with the same
/// inputs and outputs can be trained and checkpointed.
pub trait PoseRefinerNet<B: Backend> {
    /// Predict the refinement for `[batch, 3, H, W]` images and the
    /// `[batch, 12]` flattened initial pose.
    fn refine(
        &self,
        observed: Tensor<B, 4>,
        rendered: Tensor<B, 4>,
        pose: Tensor<B, 2>,
    ) -> RefinerOutput<B>;
}

/// Siamese image encoder, pose embedding and three regression heads.
#[derive(Module, Debug)]
pub struct PoseRefiner<B: Backend> {
    encoder: ImageEncoder<B>,
    pose_embedding: Linear<B>,
    trunk: Mlp<B>,
    xy_head: Linear<B>,
    z_head: Linear<B>,
    rotation_head: Linear<B>,
    activation: Relu,
}

impl PoseRefinerConfig {
    /// Initialize the network.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PoseRefiner<B> {
        let (hidden, trunk_out) = match self.hidden_dims.split_last() {
            Some((&last, rest)) => (rest.to_vec(), last),
            None => (Vec::new(), self.trunk_input_dim()),
        };

        let trunk = MlpConfig::new(self.trunk_input_dim(), trunk_out)
            .with_hidden_dims(hidden)
            .with_dropout(self.dropout)
            .with_final_activation(true)
            .init(device);

        PoseRefiner {
            encoder: ImageEncoder::new(&self.encoder, device),
            pose_embedding: LinearConfig::new(12, self.pose_embedding_dim).init(device),
            trunk,
            xy_head: LinearConfig::new(trunk_out, 2).init(device),
            z_head: LinearConfig::new(trunk_out, 1).init(device),
            rotation_head: LinearConfig::new(trunk_out, 4).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> PoseRefinerNet<B> for PoseRefiner<B> {
    fn refine(
        &self,
        observed: Tensor<B, 4>,
        rendered: Tensor<B, 4>,
        pose: Tensor<B, 2>,
    ) -> RefinerOutput<B> {
        let observed = self.encoder.forward(observed);
        let rendered = self.encoder.forward(rendered);
        let pose = self.activation.forward(self.pose_embedding.forward(pose));

        let h = self.trunk.forward(Tensor::cat(vec![observed, rendered, pose], 1));

        RefinerOutput {
            xy: self.xy_head.forward(h.clone()),
            z: self.z_head.forward(h.clone()),
            rotation: self.rotation_head.forward(h),
        }
    }
}
