//! Checkpoint save/load for the best model.
//!
//! A checkpoint is a single slot at the configured path, overwritten on every
//! improvement:
//!
//! - `<name>.bin`: model record (`BinFileRecorder`, full precision)
//! - `<name>.json`: [`CheckpointMetadata`] of the epoch that produced it
//! - `<name>.config.json`: the [`TrainingConfig`] of the run, written once
//!   when training starts, so the network can be rebuilt for loading

use std::fs;
use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::module::Module;
use burn::prelude::*;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::{NeuralRefineError, Result};
use crate::nn::PoseRefiner;

/// Checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Checkpoint metadata stored as JSON next to the model record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Epoch that produced the checkpoint (1-based).
    pub epoch: usize,
    /// Training loss reported for that epoch.
    pub train_loss: f64,
    /// Validation loss reported for that epoch.
    pub valid_loss: f64,
    /// Best validation loss before this epoch (`None` on the first save).
    pub previous_best: Option<f64>,
    /// Outliers seen so far in the run.
    pub outliers: usize,
    /// Checkpoint version for compatibility.
    pub version: u32,
}

impl CheckpointMetadata {
    /// Create metadata for an epoch.
    pub fn new(epoch: usize, train_loss: f64, valid_loss: f64) -> Self {
        Self {
            epoch,
            train_loss,
            valid_loss,
            previous_best: None,
            outliers: 0,
            version: CHECKPOINT_VERSION,
        }
    }

    /// Record the best loss this checkpoint replaced (ignored if infinite).
    pub fn with_previous_best(mut self, previous: f64) -> Self {
        self.previous_best = previous.is_finite().then_some(previous);
        self
    }

    /// Record the run's outlier count.
    pub fn with_outliers(mut self, outliers: usize) -> Self {
        self.outliers = outliers;
        self
    }
}

/// Path of the model record. The recorder always writes a `.bin` extension.
pub fn record_path(path: &Path) -> PathBuf {
    path.with_extension("bin")
}

/// Path of the metadata sidecar.
pub fn metadata_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

/// Path of the training configuration sidecar.
pub fn config_path(path: &Path) -> PathBuf {
    path.with_extension("config.json")
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| NeuralRefineError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Save a model and its metadata, replacing any previous checkpoint.
pub fn save_checkpoint<B: Backend, M: Module<B>>(
    model: &M,
    path: &Path,
    metadata: &CheckpointMetadata,
) -> Result<()> {
    ensure_parent(path)?;

    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(record_path(path), &recorder)
        .map_err(|e| NeuralRefineError::Checkpoint {
            message: format!("failed to save {}: {e}", record_path(path).display()),
        })?;

    let meta_path = metadata_path(path);
    let json =
        serde_json::to_vec_pretty(metadata).map_err(|e| NeuralRefineError::json(&meta_path, e))?;
    fs::write(&meta_path, json).map_err(|e| NeuralRefineError::io(&meta_path, e))?;

    log::debug!(
        "Saved checkpoint to {:?} (epoch {}, valid loss {:.6})",
        record_path(path),
        metadata.epoch,
        metadata.valid_loss
    );

    Ok(())
}

/// Load model weights into a structurally identical `model`.
pub fn load_checkpoint<B: Backend, M: Module<B>>(
    model: M,
    path: &Path,
    device: &B::Device,
) -> Result<M> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .load_file(record_path(path), &recorder, device)
        .map_err(|e| NeuralRefineError::Checkpoint {
            message: format!("failed to load {}: {e}", record_path(path).display()),
        })
}

/// Read the metadata sidecar.
pub fn load_metadata(path: &Path) -> Result<CheckpointMetadata> {
    let meta_path = metadata_path(path);
    let raw = fs::read(&meta_path).map_err(|e| NeuralRefineError::io(&meta_path, e))?;
    serde_json::from_slice(&raw).map_err(|e| NeuralRefineError::json(&meta_path, e))
}

/// Write the configuration sidecar.
pub fn save_training_config(config: &TrainingConfig, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let cfg_path = config_path(path);
    config
        .save(&cfg_path)
        .map_err(|e| NeuralRefineError::io(&cfg_path, e))
}

/// Rebuild a [`PoseRefiner`] from the configuration sidecar and load its weights.
pub fn load_refiner_checkpoint<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> Result<(PoseRefiner<B>, CheckpointMetadata)> {
    let cfg_path = config_path(path);
    let config = TrainingConfig::load(&cfg_path).map_err(|e| NeuralRefineError::Checkpoint {
        message: format!("failed to read {}: {e}", cfg_path.display()),
    })?;

    let model = load_checkpoint(config.model.init::<B>(device), path, device)?;
    let metadata = load_metadata(path)?;

    log::info!(
        "Loaded checkpoint from {:?} (epoch {}, valid loss {:.6})",
        record_path(path),
        metadata.epoch,
        metadata.valid_loss
    );

    Ok((model, metadata))
}

/// Check if a complete checkpoint exists at the given path.
pub fn checkpoint_exists(path: &Path) -> bool {
    record_path(path).exists() && metadata_path(path).exists()
}
