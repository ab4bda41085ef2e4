//! Per-epoch loss accounting and run-level training state.

use refine_core::{CheckpointPolicy, Improvement, OutlierGate};

/// Running loss sum for one pass (train or validation) of one epoch.
///
/// The average divides by the size of the split, not by the number of kept
/// samples, so outliers pull the reported average towards zero. The
/// checkpoint policy sees this value; [`kept_average`](Self::kept_average)
/// is available for reporting only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochAccumulator {
    loss_sum: f64,
    kept: usize,
    outliers: usize,
    split_size: usize,
}

impl EpochAccumulator {
    /// Fresh accumulator for a split of `split_size` samples.
    pub fn new(split_size: usize) -> Self {
        Self {
            loss_sum: 0.0,
            kept: 0,
            outliers: 0,
            split_size,
        }
    }

    /// Add a kept loss.
    pub fn keep(&mut self, loss: f64) {
        self.loss_sum += loss;
        self.kept += 1;
    }

    /// Count an outlier; its loss is not accumulated.
    pub fn reject(&mut self) {
        self.outliers += 1;
    }

    /// Sum of kept losses.
    pub fn loss_sum(&self) -> f64 {
        self.loss_sum
    }

    /// Number of kept samples.
    pub fn kept(&self) -> usize {
        self.kept
    }

    /// Number of outliers in this pass.
    pub fn outliers(&self) -> usize {
        self.outliers
    }

    /// Size of the split this pass ran over.
    pub fn split_size(&self) -> usize {
        self.split_size
    }

    /// `loss_sum / split_size`, or `0.0` for an empty split.
    pub fn average(&self) -> f64 {
        if self.split_size == 0 {
            0.0
        } else {
            self.loss_sum / self.split_size as f64
        }
    }

    /// `loss_sum / kept`, or `None` if every sample was an outlier.
    pub fn kept_average(&self) -> Option<f64> {
        (self.kept > 0).then(|| self.loss_sum / self.kept as f64)
    }
}

/// What happened in one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Training pass.
    pub train: EpochAccumulator,
    /// Validation pass.
    pub valid: EpochAccumulator,
    /// Set when the model was saved after this epoch.
    pub improvement: Option<Improvement>,
}

impl EpochSummary {
    /// Reported training loss.
    pub fn train_loss(&self) -> f64 {
        self.train.average()
    }

    /// Reported validation loss; drives checkpointing.
    pub fn valid_loss(&self) -> f64 {
        self.valid.average()
    }

    /// Whether a checkpoint was written after this epoch.
    pub fn saved(&self) -> bool {
        self.improvement.is_some()
    }

    /// Training and validation averages over kept samples only.
    pub fn kept_average(&self) -> (Option<f64>, Option<f64>) {
        (self.train.kept_average(), self.valid.kept_average())
    }
}

/// State carried across epochs: outlier gate, checkpoint policy and history.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSession {
    /// Outlier gate; counts outliers over the whole run.
    pub gate: OutlierGate,
    /// Best-validation-loss policy.
    pub checkpoint: CheckpointPolicy,
    /// One entry per completed epoch.
    pub history: Vec<EpochSummary>,
}

impl TrainingSession {
    /// A session that has not run any epoch.
    pub fn new(outlier_threshold: f64) -> Self {
        Self {
            gate: OutlierGate::new(outlier_threshold),
            checkpoint: CheckpointPolicy::new(),
            history: Vec::new(),
        }
    }

    /// Best validation loss so far (`+inf` before the first epoch).
    pub fn best_validation_loss(&self) -> f64 {
        self.checkpoint.best()
    }

    /// Outliers over all epochs, train and validation.
    pub fn outlier_count(&self) -> usize {
        self.gate.outliers()
    }

    /// Number of completed epochs.
    pub fn epochs_completed(&self) -> usize {
        self.history.len()
    }

    /// Most recent epoch, if any.
    pub fn last_epoch(&self) -> Option<&EpochSummary> {
        self.history.last()
    }
}
