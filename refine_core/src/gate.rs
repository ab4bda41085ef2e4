//! Outlier gating and best-loss checkpoint policy.
//!
//! Both are small state machines driven once per sample (the gate) and once per
//! epoch (the checkpoint policy). They hold no tensors so the trainer can thread
//! them explicitly instead of relying on module-level state.

/// Losses at or above this value are treated as outliers.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 1000.0;

/// What to do with a per-sample loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The loss is used: backpropagated (training) and accumulated.
    Keep,
    /// The loss is dropped from both the update and the running sum.
    Outlier,
}

/// Hard-threshold outlier filter.
///
/// A loss is kept only if `loss < threshold`; equality, larger values and NaN
/// are outliers. Every outlier increments the gate's counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierGate {
    threshold: f64,
    outliers: usize,
}

impl OutlierGate {
    /// Create a gate with the given exclusive threshold.
    pub const fn new(threshold: f64) -> Self {
        Self {
            threshold,
            outliers: 0,
        }
    }

    /// Classify a loss without touching the counter.
    #[inline]
    pub fn classify(&self, loss: f64) -> GateDecision {
        if loss < self.threshold {
            GateDecision::Keep
        } else {
            GateDecision::Outlier
        }
    }

    /// Classify a loss and count it if it is an outlier.
    pub fn admit(&mut self, loss: f64) -> GateDecision {
        let decision = self.classify(loss);
        if decision == GateDecision::Outlier {
            self.outliers += 1;
        }
        decision
    }

    /// Number of outliers seen so far.
    #[inline]
    pub fn outliers(&self) -> usize {
        self.outliers
    }
}

impl Default for OutlierGate {
    fn default() -> Self {
        Self::new(DEFAULT_OUTLIER_THRESHOLD)
    }
}

/// A validation loss that beat (or tied) the previous best.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Improvement {
    /// Best loss before this epoch (`+inf` on the first epoch).
    pub previous: f64,
    /// The new best loss.
    pub current: f64,
}

/// Tracks the best validation loss and decides when to persist the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointPolicy {
    best: f64,
}

impl CheckpointPolicy {
    /// A policy that has not seen any epoch yet.
    pub const fn new() -> Self {
        Self {
            best: f64::INFINITY,
        }
    }

    /// Best validation loss so far.
    #[inline]
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Record an epoch's validation loss.
    ///
    /// Returns `Some` when the model should be saved: `loss <= best`, ties
    /// included. The best value only ever moves down.
    pub fn observe(&mut self, loss: f64) -> Option<Improvement> {
        if loss <= self.best {
            let improvement = Improvement {
                previous: self.best,
                current: loss,
            };
            self.best = loss;
            Some(improvement)
        } else {
            None
        }
    }
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self::new()
    }
}
