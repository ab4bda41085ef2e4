//! Neural network modules for pose refinement.
//!
//! This module provides:
//! - An image encoder shared between the observed and rendered image
//! - MLP building blocks
//! - The refiner network and the [`PoseRefinerNet`] interface the trainer uses

pub mod image_encoder;
pub mod mlp;
pub mod refiner;

pub use image_encoder::ImageEncoder;
pub use mlp::{Mlp, MlpConfig};
pub use refiner::{PoseRefiner, PoseRefinerNet, RefinerOutput};
