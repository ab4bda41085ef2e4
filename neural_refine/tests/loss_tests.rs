//! Integration tests for the matching loss.

use approx::assert_abs_diff_eq;
use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::SeedableRng;
use refine_core::{compose_pose, matching_loss, matching_loss_at, Point3, Pose, Quaternion};

use neural_refine::data::PointCloud;
use neural_refine::loss::MatchingLoss;
use neural_refine::nn::RefinerOutput;
use neural_refine::pose::{compose_refined_pose, PoseTensor, RotationGradient};

type TestBackend = NdArray;

fn grid_cloud(n: usize) -> PointCloud {
    PointCloud::new(
        (0..n)
            .map(|i| {
                let f = i as f32;
                Point3::new(
                    ((f * 0.37).sin()) * 0.1,
                    ((f * 0.11).cos()) * 0.1,
                    ((f * 0.07).sin()) * 0.05,
                )
            })
            .collect(),
    )
}

fn points_tensor<B: Backend>(points: &[Point3], device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = points.iter().flat_map(|p| p.as_array()).collect();
    Tensor::from_data(TensorData::new(flat, [points.len(), 3]), device)
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f32 {
    t.into_data().convert::<f32>().to_vec::<f32>().unwrap()[0]
}

fn tilted_pose() -> Pose {
    compose_pose(Quaternion::new(0.1, -0.2, 0.05, 0.97), [0.03, -0.02], 0.75).unwrap()
}

#[test]
fn test_tensor_loss_matches_host_loss() {
    let device = Default::default();
    let cloud = grid_cloud(500);
    let truth = Pose::from_matrix_3x4([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.8],
    ]);
    let pred = tilted_pose();

    let loss = MatchingLoss::new(500);
    let value = scalar(loss.forward_points(
        points_tensor::<TestBackend>(&cloud.points, &device),
        &PoseTensor::from_pose(&truth, &device),
        &PoseTensor::from_pose(&pred, &device),
    ));

    let indices: Vec<usize> = (0..cloud.len()).collect();
    let host = matching_loss_at(&cloud.points, &indices, &truth, &pred);
    assert!((value - host).abs() < 1e-4, "tensor {value} vs host {host}");
}

#[test]
fn test_sampled_loss_matches_host_with_same_seed() {
    let device = Default::default();
    let cloud = grid_cloud(4000);
    let truth = Pose::default();
    let pred = tilted_pose();

    let loss = MatchingLoss::default();
    let value = scalar(
        loss.forward::<TestBackend, _>(
            &mut StdRng::seed_from_u64(11),
            &cloud,
            &PoseTensor::from_pose(&truth, &device),
            &PoseTensor::from_pose(&pred, &device),
        )
        .unwrap(),
    );

    let host = matching_loss(&mut StdRng::seed_from_u64(11), &cloud.points, &truth, &pred, 3000)
        .unwrap();
    assert!((value - host).abs() < 1e-4, "tensor {value} vs host {host}");
}

#[test]
fn test_pure_translation_offset() {
    let device = Default::default();
    let cloud = grid_cloud(3000);
    let truth = Pose::default();
    let mut pred = Pose::default();
    pred.translation = Point3::new(0.1, -0.2, 0.3);

    // Every point moves by the same offset: L1 = 0.1 + 0.2 + 0.3.
    let value = scalar(
        MatchingLoss::default()
            .forward::<TestBackend, _>(
                &mut StdRng::seed_from_u64(0),
                &cloud,
                &PoseTensor::from_pose(&truth, &device),
                &PoseTensor::from_pose(&pred, &device),
            )
            .unwrap(),
    );
    assert_abs_diff_eq!(value, 0.6, epsilon = 1e-4);
}

#[test]
fn test_identical_poses_give_zero_loss() {
    let device = Default::default();
    let cloud = grid_cloud(3000);
    let pose = PoseTensor::<TestBackend>::from_pose(&tilted_pose(), &device);

    let value = scalar(
        MatchingLoss::default()
            .forward(&mut StdRng::seed_from_u64(5), &cloud, &pose, &pose)
            .unwrap(),
    );
    assert!(value.abs() < 1e-6);
}

#[test]
fn test_loss_gradient_reaches_translation_head() {
    type AD = Autodiff<NdArray>;
    let device = Default::default();
    let cloud = grid_cloud(3000);

    let xy = Tensor::<AD, 2>::from_data(TensorData::new(vec![0.2f32, 0.0], [1, 2]), &device)
        .require_grad();
    let z = Tensor::<AD, 2>::from_data(TensorData::new(vec![1.0f32], [1, 1]), &device)
        .require_grad();
    let rotation =
        Tensor::<AD, 2>::from_data(TensorData::new(vec![0.0f32, 0.0, 0.0, 1.0], [1, 4]), &device);

    let refined = compose_refined_pose(
        RefinerOutput {
            xy: xy.clone(),
            z: z.clone(),
            rotation,
        },
        RotationGradient::Detached,
    )
    .unwrap();
    let truth = PoseTensor::from_pose(&Pose::default(), &device);

    let loss = MatchingLoss::default()
        .forward(&mut StdRng::seed_from_u64(3), &cloud, &truth, &refined)
        .unwrap();
    let grads = loss.backward();

    // d/dx |x| = sign(x) per point, averaged over M points.
    let gx = xy.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();
    let gz = z.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();
    assert_abs_diff_eq!(gx[0], 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(gx[1], 0.0, epsilon = 1e-4);
    assert_abs_diff_eq!(gz[0], 1.0, epsilon = 1e-4);
}
