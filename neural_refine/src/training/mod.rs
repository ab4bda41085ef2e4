//! Training infrastructure for pose refinement.
//!
//! This module provides:
//! - `PoseRefinerTrainer`: the epoch driver
//! - Per-epoch loss accounting and run state
//! - Checkpoint save/load for the best model

pub mod checkpoint;
mod metrics;
mod trainer;

pub use checkpoint::{
    checkpoint_exists, load_checkpoint, load_metadata, load_refiner_checkpoint, save_checkpoint,
    CheckpointMetadata,
};
pub use metrics::{EpochAccumulator, EpochSummary, TrainingSession};
pub use trainer::PoseRefinerTrainer;
