//! Training configuration types.

use burn::config::Config;
use refine_core::{DEFAULT_NUM_POINTS, DEFAULT_OUTLIER_THRESHOLD};

use super::PoseRefinerConfig;
use crate::pose::RotationGradient;

/// Configuration for the pose refinement trainer.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Dataset root. Point clouds live at `<root_dir>/<label>/object.xyz`.
    pub root_dir: String,

    /// Class labels to train on.
    pub classes: Vec<String>,

    /// Network configuration.
    #[config(default = "PoseRefinerConfig::new()")]
    pub model: PoseRefinerConfig,

    /// Number of epochs.
    #[config(default = 5)]
    pub epochs: usize,

    /// Fraction of samples held out for validation.
    #[config(default = 0.2)]
    pub valid_fraction: f64,

    /// Adam learning rate.
    #[config(default = 3e-4)]
    pub learning_rate: f64,

    /// Adam weight decay.
    #[config(default = 3e-5)]
    pub weight_decay: f64,

    /// Per-sample losses at or above this value are outliers.
    #[config(default = "DEFAULT_OUTLIER_THRESHOLD")]
    pub outlier_threshold: f64,

    /// Points drawn from the object cloud for every loss evaluation.
    #[config(default = "DEFAULT_NUM_POINTS")]
    pub num_points: usize,

    /// Where the best model is written (overwritten on every improvement).
    #[config(default = "String::from(\"pose_refiner.bin\")")]
    pub checkpoint_path: String,

    /// RNG seed for the split, the shuffles and point sampling.
    pub seed: Option<u64>,

    /// Keep each label's point cloud in memory after the first read.
    #[config(default = false)]
    pub cache_point_clouds: bool,

    /// How gradients flow through the predicted rotation.
    #[config(default = "RotationGradient::Detached")]
    pub rotation_gradient: RotationGradient,
}

impl TrainingConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.model.validate()?;

        if self.classes.is_empty() {
            return Err("classes must not be empty".to_string());
        }
        if self.epochs == 0 {
            return Err("epochs must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.valid_fraction) {
            return Err("valid_fraction must be in [0, 1)".to_string());
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err("learning_rate must be positive".to_string());
        }
        if self.weight_decay.is_nan() || self.weight_decay < 0.0 {
            return Err("weight_decay must be non-negative".to_string());
        }
        if self.outlier_threshold.is_nan() || self.outlier_threshold <= 0.0 {
            return Err("outlier_threshold must be positive".to_string());
        }
        if self.num_points == 0 {
            return Err("num_points must be positive".to_string());
        }
        if self.checkpoint_path.is_empty() {
            return Err("checkpoint_path must not be empty".to_string());
        }

        Ok(())
    }
}
