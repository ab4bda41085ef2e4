//! Train/validation split and per-epoch orderings.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{NeuralRefineError, Result};

/// Disjoint train and validation index sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSplit {
    /// Indices used for optimisation.
    pub train: Vec<usize>,
    /// Indices used for evaluation only.
    pub valid: Vec<usize>,
}

impl DatasetSplit {
    /// Number of validation samples for a dataset of `len` samples.
    pub fn valid_len(len: usize, valid_fraction: f64) -> usize {
        (valid_fraction * len as f64).floor() as usize
    }

    /// Shuffle `0..len` once; the first `floor(valid_fraction * len)` indices
    /// become the validation split, the rest the training split.
    ///
    /// Both splits must be non-empty.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, len: usize, valid_fraction: f64) -> Result<Self> {
        let split = Self::valid_len(len, valid_fraction);

        if split == 0 {
            return Err(NeuralRefineError::EmptySplit {
                split: "validation",
                samples: len,
                valid_fraction,
            });
        }
        if split >= len {
            return Err(NeuralRefineError::EmptySplit {
                split: "train",
                samples: len,
                valid_fraction,
            });
        }

        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(rng);
        let train = indices.split_off(split);

        Ok(Self {
            train,
            valid: indices,
        })
    }
}

/// A fresh random permutation of `indices`.
pub fn epoch_order<R: Rng + ?Sized>(rng: &mut R, indices: &[usize]) -> Vec<usize> {
    let mut order = indices.to_vec();
    order.shuffle(rng);
    order
}
