//! Point-cloud matching loss.
//!
//! Host-side reference implementation of the loss the trainer optimises:
//! a random subset of the object's points is transformed by the ground-truth
//! and the predicted pose, and the L1 discrepancy is summed per point and
//! averaged over the subset.
//!
//! ```text
//! L = (1 / M) * Σ_i || p_i · R_pred + t_pred - (p_i · R_true + t_true) ||_1
//! ```
//!
//! Note that the divisor is the number of sampled points `M`, not `3 * M`.

use rand::Rng;

use crate::alloc_prelude::Vec;
use crate::error::{RefineCoreError, Result};
use crate::pose::Pose;
use crate::types::Point3;

/// Number of points drawn from the cloud for every loss evaluation.
pub const DEFAULT_NUM_POINTS: usize = 3000;

/// Draw `amount` distinct indices uniformly from `0..available`.
///
/// Fails with [`RefineCoreError::InsufficientPoints`] when the cloud is too
/// small to sample without replacement.
pub fn sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    available: usize,
    amount: usize,
) -> Result<Vec<usize>> {
    if available < amount {
        return Err(RefineCoreError::InsufficientPoints {
            required: amount,
            available,
        });
    }
    Ok(rand::seq::index::sample(rng, available, amount).into_vec())
}

/// Matching loss over an explicit subset of the cloud.
///
/// Returns `0.0` for an empty subset.
///
/// # Panics
///
/// Panics if any index is out of bounds for `points`. Indices from
/// [`sample_indices`] always are in bounds.
pub fn matching_loss_at(points: &[Point3], indices: &[usize], truth: &Pose, pred: &Pose) -> f32 {
    if indices.is_empty() {
        return 0.0;
    }

    let total: f32 = indices
        .iter()
        .map(|&i| {
            let p = points[i];
            (pred.transform_point(p) - truth.transform_point(p)).l1_norm()
        })
        .sum();

    total / indices.len() as f32
}

/// Matching loss over a fresh random subset of `num_points` points.
pub fn matching_loss<R: Rng + ?Sized>(
    rng: &mut R,
    points: &[Point3],
    truth: &Pose,
    pred: &Pose,
    num_points: usize,
) -> Result<f32> {
    let indices = sample_indices(rng, points.len(), num_points)?;
    Ok(matching_loss_at(points, &indices, truth, pred))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IDENTITY_MAT3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid_cloud(n: usize) -> Vec<Point3> {
        (0..n)
            .map(|i| {
                let f = i as f32;
                Point3::new(f * 0.001, libm::sinf(f * 0.37), libm::cosf(f * 0.11))
            })
            .collect()
    }

    #[test]
    fn test_sample_indices_are_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut idx = sample_indices(&mut rng, 3500, 3000).unwrap();
        assert_eq!(idx.len(), 3000);

        idx.sort_unstable();
        idx.dedup();
        assert_eq!(idx.len(), 3000);
        assert!(idx.iter().all(|&i| i < 3500));
    }

    #[test]
    fn test_sample_indices_insufficient() {
        let mut rng = StdRng::seed_from_u64(7);
        let err = sample_indices(&mut rng, 2999, 3000).unwrap_err();
        assert_eq!(
            err,
            RefineCoreError::InsufficientPoints {
                required: 3000,
                available: 2999
            }
        );
    }

    #[test]
    fn test_loss_zero_for_equal_poses() {
        let mut rng = StdRng::seed_from_u64(1);
        let cloud = grid_cloud(4000);
        let pose = Pose::from_matrix_3x4([
            [0.0, -1.0, 0.0, 0.3],
            [1.0, 0.0, 0.0, 0.1],
            [0.0, 0.0, 1.0, 2.0],
        ]);

        for _ in 0..5 {
            let loss = matching_loss(&mut rng, &cloud, &pose, &pose, DEFAULT_NUM_POINTS).unwrap();
            assert_eq!(loss, 0.0);
        }
    }

    #[test]
    fn test_loss_pure_translation_divides_by_point_count() {
        let cloud = grid_cloud(10);
        let indices: Vec<usize> = (0..10).collect();
        let truth = Pose::IDENTITY;
        let pred = Pose::new(IDENTITY_MAT3, Point3::new(1.0, -2.0, 0.5));

        // Every point moves by the same offset, |1| + |-2| + |0.5| = 3.5.
        let loss = matching_loss_at(&cloud, &indices, &truth, &pred);
        assert!((loss - 3.5).abs() < 1e-5);
    }

    #[test]
    fn test_loss_empty_subset() {
        let cloud = grid_cloud(3);
        assert_eq!(
            matching_loss_at(&cloud, &[], &Pose::IDENTITY, &Pose::IDENTITY),
            0.0
        );
    }

    #[test]
    #[should_panic]
    fn test_loss_rejects_out_of_range_index() {
        let cloud = grid_cloud(3);
        matching_loss_at(&cloud, &[3], &Pose::IDENTITY, &Pose::IDENTITY);
    }
}
