//! # neural_refine
//!
//! Learned 6-DoF pose refinement with Burn.
//!
//! A refiner network looks at an observed image, an image rendered at an
//! initial pose estimate and the estimate itself, and predicts a corrected
//! pose. Training minimises a point-cloud matching loss against the
//! ground-truth pose, skips outlier samples and keeps the checkpoint with the
//! best validation loss. The pose math lives in `refine_core`.
//!
//! ## Features
//!
//! - **Refiner network**: siamese conv encoder, pose embedding, xy/z/quaternion heads
//! - **Pose composer**: sanitized quaternion to rotation, detached or differentiable
//! - **Matching loss**: 3000-point L1 loss, differentiable in the predicted pose
//! - **Trainer**: train/validation split, outlier gate, best-loss checkpointing
//! - **Datasets**: `.xyz` point clouds and an on-disk image/pose dataset
//!
//! ## Quick Start
//!
//! ```ignore
//! use neural_refine::prelude::*;
//!
//! let config = TrainingConfig::new("data".into(), vec!["ape".into()]);
//! let device = Default::default();
//! let model = config.model.init::<TrainBackend>(&device);
//!
//! let dataset = DirectoryDataset::open(&config.root_dir, &config.classes)?;
//! let mut trainer = PoseRefinerTrainer::<TrainBackend, _>::new(model, config, &device)?;
//! let session = trainer.fit(&dataset)?;
//! println!("best validation loss {:.6}", session.best_validation_loss());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! refine_core (pose math, gate, checkpoint policy)
//!     │
//!     ▼
//! neural_refine
//!   data ─► nn ─► pose ─► loss ─► training ─► pose_refiner.bin
//! ```
//!
//! ## Feature Flags
//!
//! - `wgpu`: train on the GPU through WebGPU instead of ndarray

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data;
pub mod error;
pub mod loss;
pub mod nn;
pub mod pose;
pub mod training;

/// Backend used by the training binary.
#[cfg(not(feature = "wgpu"))]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray<f32>>;

/// Backend used by the training binary.
#[cfg(feature = "wgpu")]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// Re-export key types for convenience
pub use config::{PoseRefinerConfig, TrainingConfig};
pub use error::{NeuralRefineError, Result};
pub use loss::MatchingLoss;
pub use nn::{PoseRefiner, PoseRefinerNet, RefinerOutput};
pub use pose::{compose_refined_pose, PoseTensor, RotationGradient};
pub use training::{PoseRefinerTrainer, TrainingSession};

// Re-export from refine_core for convenience
pub use refine_core::{Point3, Pose, Quaternion};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{ImageEncoderConfig, PoseRefinerConfig, TrainingConfig};
    pub use crate::data::{
        DatasetSplit, DirectoryDataset, ImageData, InMemorySource, PointCloud, PointCloudStore,
        PoseSample, SampleRecord, SampleSource,
    };
    pub use crate::error::{NeuralRefineError, Result};
    pub use crate::loss::MatchingLoss;
    pub use crate::nn::{ImageEncoder, PoseRefiner, PoseRefinerNet, RefinerOutput};
    pub use crate::pose::{compose_refined_pose, PoseTensor, RotationGradient};
    pub use crate::training::{
        checkpoint_exists, load_checkpoint, load_refiner_checkpoint, save_checkpoint,
        CheckpointMetadata, EpochAccumulator, EpochSummary, PoseRefinerTrainer, TrainingSession,
    };
    pub use crate::TrainBackend;

    pub use refine_core::{Point3, Pose, Quaternion};
}
