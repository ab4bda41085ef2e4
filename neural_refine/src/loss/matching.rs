//! Point-cloud matching loss on tensors.

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::Rng;
use refine_core::{sample_indices, DEFAULT_NUM_POINTS};

use crate::data::PointCloud;
use crate::error::Result;
use crate::pose::PoseTensor;

/// Matching loss calculator.
///
/// Draws `num_points` distinct points from the object cloud, transforms them
/// by the ground-truth and the predicted pose and returns
///
/// ```text
/// L = (1 / M) * Σ_i || p_i · R_pred + t_pred - (p_i · R_true + t_true) ||_1
/// ```
///
/// The result is differentiable in the predicted pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingLoss {
    num_points: usize,
}

impl Default for MatchingLoss {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_POINTS)
    }
}

impl MatchingLoss {
    /// Create a loss sampling `num_points` points per evaluation.
    pub fn new(num_points: usize) -> Self {
        Self { num_points }
    }

    /// Points drawn per evaluation.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Draw the subset used for one evaluation as a `[M, 3]` tensor.
    ///
    /// Clouds smaller than `num_points` are rejected.
    pub fn sample_points<B: Backend, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cloud: &PointCloud,
        device: &B::Device,
    ) -> Result<Tensor<B, 2>> {
        let indices = sample_indices(rng, cloud.len(), self.num_points)?;

        let mut flat = Vec::with_capacity(indices.len() * 3);
        for i in indices {
            flat.extend_from_slice(&cloud.points[i].as_array());
        }
        Ok(Tensor::from_data(
            TensorData::new(flat, [self.num_points, 3]),
            device,
        ))
    }

    /// Loss over an explicit `[M, 3]` point set.
    pub fn forward_points<B: Backend>(
        &self,
        points: Tensor<B, 2>,
        truth: &PoseTensor<B>,
        pred: &PoseTensor<B>,
    ) -> Tensor<B, 1> {
        let [m, _] = points.dims();
        if m == 0 {
            return Tensor::zeros([1], &points.device());
        }

        let target = truth.transform(points.clone());
        let output = pred.transform(points);

        (output - target).abs().sum().div_scalar(m as f32)
    }

    /// Loss over a fresh random subset of `cloud`.
    pub fn forward<B: Backend, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cloud: &PointCloud,
        truth: &PoseTensor<B>,
        pred: &PoseTensor<B>,
    ) -> Result<Tensor<B, 1>> {
        let points = self.sample_points(rng, cloud, &pred.translation.device())?;
        Ok(self.forward_points(points, truth, pred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use refine_core::{Point3, Pose, IDENTITY_MAT3};

    type TestBackend = NdArray;

    fn cloud(n: usize) -> PointCloud {
        PointCloud::new(
            (0..n)
                .map(|i| {
                    let f = i as f32;
                    Point3::new((f * 0.13).sin(), (f * 0.07).cos(), f * 1e-3)
                })
                .collect(),
        )
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_data().to_vec::<f32>().unwrap()[0]
    }

    #[test]
    fn test_equal_poses_give_zero() {
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(2);
        let pose = Pose::from_matrix_3x4([
            [0.0, 0.0, 1.0, 0.1],
            [0.0, 1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0, 0.5],
        ]);
        let truth = PoseTensor::<TestBackend>::from_pose(&pose, &device);

        let loss = MatchingLoss::new(100)
            .forward(&mut rng, &cloud(500), &truth, &truth.clone())
            .unwrap();
        assert_eq!(scalar(loss), 0.0);
    }

    #[test]
    fn test_translation_offset() {
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(2);
        let truth = PoseTensor::<TestBackend>::from_pose(&Pose::IDENTITY, &device);
        let pred = PoseTensor::from_pose(
            &Pose::new(IDENTITY_MAT3, Point3::new(0.5, -0.25, 0.0)),
            &device,
        );

        let loss = MatchingLoss::new(64)
            .forward(&mut rng, &cloud(64), &truth, &pred)
            .unwrap();
        assert!((scalar(loss) - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_small_cloud_is_rejected() {
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(2);
        let truth = PoseTensor::<TestBackend>::from_pose(&Pose::IDENTITY, &device);

        assert!(MatchingLoss::default()
            .forward(&mut rng, &cloud(10), &truth, &truth.clone())
            .is_err());
    }
}
