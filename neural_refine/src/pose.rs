//! Tensor-side pose composition.
//!
//! The refiner predicts a quaternion and a translation for one sample. The
//! refined pose keeps nothing of the pose the network was conditioned on: its
//! rotation is the (sanitized, normalised) quaternion and its translation is
//! `(x, y, z)` verbatim. See [`refine_core::PoseCorrection`] for the host
//! version of the same rule.

use burn::prelude::*;
use burn::tensor::TensorData;
use refine_core::{Mat3, Point3, Pose, Quaternion, RefineCoreError, SANITIZED_COMPONENT};
use serde::{Deserialize, Serialize};

use crate::error::{NeuralRefineError, Result};
use crate::nn::RefinerOutput;

/// How gradients flow through the predicted rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationGradient {
    /// The quaternion is read back to the host and converted there; the loss
    /// only trains the translation heads.
    #[default]
    Detached,
    /// The quaternion is converted with tensor ops so the rotation head
    /// receives gradients too.
    Differentiable,
}

/// A pose on a device: `[3, 3]` rotation and `[1, 3]` translation row.
#[derive(Debug, Clone)]
pub struct PoseTensor<B: Backend> {
    /// Rotation block, row-major.
    pub rotation: Tensor<B, 2>,
    /// Translation as a row vector.
    pub translation: Tensor<B, 2>,
}

impl<B: Backend> PoseTensor<B> {
    /// Upload a host pose.
    pub fn from_pose(pose: &Pose, device: &B::Device) -> Self {
        Self {
            rotation: mat3_tensor(&pose.rotation, device),
            translation: Tensor::from_data(
                TensorData::new(pose.translation.as_array().to_vec(), [1, 3]),
                device,
            ),
        }
    }

    /// Transform `[N, 3]` points in row-vector convention: `P · R + t`.
    pub fn transform(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        points.matmul(self.rotation.clone()) + self.translation.clone()
    }

    /// Read the pose back to the host.
    pub fn to_pose(&self) -> Result<Pose> {
        let r = host_values(self.rotation.clone())?;
        let t = host_values(self.translation.clone())?;
        if r.len() != 9 || t.len() != 3 {
            return Err(NeuralRefineError::InvalidData(format!(
                "pose tensor has {} rotation and {} translation values",
                r.len(),
                t.len()
            )));
        }

        let mut rotation = [[0.0; 3]; 3];
        for (i, row) in rotation.iter_mut().enumerate() {
            row.copy_from_slice(&r[i * 3..i * 3 + 3]);
        }
        Ok(Pose::new(rotation, Point3::new(t[0], t[1], t[2])))
    }
}

/// Build the refined pose from one sample's network outputs.
///
/// Non-finite quaternion components are replaced by `1.0` before conversion.
/// A quaternion with zero or non-finite norm after that is a fatal
/// [`RefineCoreError::DegenerateQuaternion`]. The translation always stays on
/// the autodiff graph; the rotation does only with
/// [`RotationGradient::Differentiable`].
pub fn compose_refined_pose<B: Backend>(
    output: RefinerOutput<B>,
    gradient: RotationGradient,
) -> Result<PoseTensor<B>> {
    let RefinerOutput { xy, z, rotation } = output;
    check_single(&xy, 2, "xy")?;
    check_single(&z, 1, "z")?;
    check_single(&rotation, 4, "rotation")?;

    let translation = Tensor::cat(vec![xy, z], 1);
    let rotation = match gradient {
        RotationGradient::Detached => {
            let device = rotation.device();
            let q = Quaternion::from_xyzw(quaternion_values(rotation)?);
            mat3_tensor(&q.sanitized().to_rotation_matrix()?, &device)
        }
        RotationGradient::Differentiable => quaternion_to_rotation(sanitize_quaternion(rotation))?,
    };

    Ok(PoseTensor {
        rotation,
        translation,
    })
}

/// Replace NaN and ±Inf components of a `[1, 4]` quaternion with `1.0`.
pub fn sanitize_quaternion<B: Backend>(q: Tensor<B, 2>) -> Tensor<B, 2> {
    let nan = q.clone().is_nan();
    let q = q.mask_fill(nan, SANITIZED_COMPONENT);
    let inf = q.clone().abs().equal_elem(f32::INFINITY);
    q.mask_fill(inf, SANITIZED_COMPONENT)
}

/// Differentiable `[x, y, z, w]` to `[3, 3]` rotation conversion.
///
/// The quaternion is normalised first. It is divided by its largest absolute
/// component before squaring so large or tiny finite outputs stay usable; only
/// the zero quaternion and non-finite components are rejected.
pub fn quaternion_to_rotation<B: Backend>(q: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
    let host = Quaternion::from_xyzw(quaternion_values(q.clone())?);
    let scale = host.max_abs();
    if scale == 0.0 || !host.is_finite() {
        return Err(RefineCoreError::DegenerateQuaternion { norm: host.norm() }.into());
    }

    let q = q.div_scalar(scale);
    let norm = q.clone().powf_scalar(2.0).sum_dim(1).sqrt();
    let q = q.div(norm);
    let component = |i: usize| q.clone().slice([0..1, i..i + 1]);
    let (x, y, z, w) = (component(0), component(1), component(2), component(3));

    let xx = x.clone() * x.clone();
    let yy = y.clone() * y.clone();
    let zz = z.clone() * z.clone();
    let xy = x.clone() * y.clone();
    let xz = x.clone() * z.clone();
    let yz = y.clone() * z.clone();
    let xw = x * w.clone();
    let yw = y * w.clone();
    let zw = z * w;

    let diag = |a: Tensor<B, 2>, b: Tensor<B, 2>| (a + b).mul_scalar(-2.0).add_scalar(1.0);
    let off = |a: Tensor<B, 2>, b: Tensor<B, 2>, sign: f32| (a + b.mul_scalar(sign)).mul_scalar(2.0);

    let entries = vec![
        diag(yy.clone(), zz.clone()),
        off(xy.clone(), zw.clone(), -1.0),
        off(xz.clone(), yw.clone(), 1.0),
        off(xy, zw, 1.0),
        diag(xx.clone(), zz),
        off(yz.clone(), xw.clone(), -1.0),
        off(xz, yw, -1.0),
        off(yz, xw, 1.0),
        diag(xx, yy),
    ];

    Ok(Tensor::cat(entries, 1).reshape([3, 3]))
}

fn mat3_tensor<B: Backend>(m: &Mat3, device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = m.iter().flatten().copied().collect();
    Tensor::from_data(TensorData::new(flat, [3, 3]), device)
}

fn host_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| NeuralRefineError::TensorData {
            message: format!("{e:?}"),
        })
}

fn quaternion_values<B: Backend>(q: Tensor<B, 2>) -> Result<[f32; 4]> {
    let values = host_values(q)?;
    <[f32; 4]>::try_from(values.as_slice()).map_err(|_| {
        NeuralRefineError::InvalidData(format!("quaternion has {} values", values.len()))
    })
}

fn check_single<B: Backend>(tensor: &Tensor<B, 2>, width: usize, name: &str) -> Result<()> {
    let dims = tensor.dims();
    if dims != [1, width] {
        return Err(NeuralRefineError::InvalidData(format!(
            "{name} output has shape {dims:?}, expected [1, {width}]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use refine_core::compose_pose;

    type TestBackend = NdArray;

    fn output(q: [f32; 4], xy: [f32; 2], z: f32) -> RefinerOutput<TestBackend> {
        let device = Default::default();
        RefinerOutput {
            xy: Tensor::from_data(TensorData::new(xy.to_vec(), [1, 2]), &device),
            z: Tensor::from_data(TensorData::new(vec![z], [1, 1]), &device),
            rotation: Tensor::from_data(TensorData::new(q.to_vec(), [1, 4]), &device),
        }
    }

    fn assert_pose_close(a: &Pose, b: &Pose) {
        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (a.rotation[i][j] - b.rotation[i][j]).abs() < 1e-5,
                    "{a:?} vs {b:?}"
                );
            }
        }
        assert!((a.translation - b.translation).l1_norm() < 1e-6);
    }

    #[test]
    fn test_detached_matches_host_composer() {
        let q = [0.3, -0.2, 0.1, 0.9];
        let refined = compose_refined_pose(output(q, [0.1, -0.2], 0.8), RotationGradient::Detached)
            .unwrap()
            .to_pose()
            .unwrap();
        let host = compose_pose(Quaternion::from_xyzw(q), [0.1, -0.2], 0.8).unwrap();

        assert_pose_close(&refined, &host);
    }

    #[test]
    fn test_differentiable_matches_host_composer() {
        let q = [-0.5, 0.4, 0.7, 0.2];
        let refined =
            compose_refined_pose(output(q, [0.0, 0.3], 1.2), RotationGradient::Differentiable)
                .unwrap()
                .to_pose()
                .unwrap();
        let host = compose_pose(Quaternion::from_xyzw(q), [0.0, 0.3], 1.2).unwrap();

        assert_pose_close(&refined, &host);
    }

    #[test]
    fn test_sanitization_in_both_modes() {
        let q = [f32::NAN, 0.0, 0.0, f32::NEG_INFINITY];
        let host = compose_pose(Quaternion::new(1.0, 0.0, 0.0, 1.0), [0.0, 0.0], 1.0).unwrap();

        for mode in [RotationGradient::Detached, RotationGradient::Differentiable] {
            let refined = compose_refined_pose(output(q, [0.0, 0.0], 1.0), mode)
                .unwrap()
                .to_pose()
                .unwrap();
            assert_pose_close(&refined, &host);
        }
    }

    #[test]
    fn test_extreme_finite_quaternions_in_both_modes() {
        let host = compose_pose(Quaternion::new(1.0, 0.0, 0.0, 1.0), [0.0, 0.0], 1.0).unwrap();

        for scale in [1e20f32, 1e-23] {
            for mode in [RotationGradient::Detached, RotationGradient::Differentiable] {
                let refined =
                    compose_refined_pose(output([scale, 0.0, 0.0, scale], [0.0, 0.0], 1.0), mode)
                        .unwrap()
                        .to_pose()
                        .unwrap();
                assert_pose_close(&refined, &host);
            }
        }
    }

    #[test]
    fn test_zero_quaternion_is_fatal() {
        for mode in [RotationGradient::Detached, RotationGradient::Differentiable] {
            let err = compose_refined_pose(output([0.0; 4], [0.0, 0.0], 1.0), mode).unwrap_err();
            assert!(matches!(
                err,
                NeuralRefineError::Core(RefineCoreError::DegenerateQuaternion { .. })
            ));
        }
    }

    #[test]
    fn test_batched_output_is_rejected() {
        let device = Default::default();
        let out = RefinerOutput::<TestBackend> {
            xy: Tensor::zeros([2, 2], &device),
            z: Tensor::zeros([2, 1], &device),
            rotation: Tensor::ones([2, 4], &device),
        };
        assert!(compose_refined_pose(out, RotationGradient::Detached).is_err());
    }

    #[test]
    fn test_transform_row_convention() {
        let device = Default::default();
        let pose = Pose::from_matrix_3x4([
            [0.0, -1.0, 0.0, 0.1],
            [1.0, 0.0, 0.0, -0.2],
            [0.0, 0.0, 1.0, 0.7],
        ]);
        let tensor = PoseTensor::<TestBackend>::from_pose(&pose, &device);
        let points = Tensor::from_data(TensorData::new(vec![1.0f32, 0.0, 0.0], [1, 3]), &device);

        let out = host_values(tensor.transform(points)).unwrap();
        let expected = pose.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!((Point3::new(out[0], out[1], out[2]) - expected).l1_norm() < 1e-6);
    }

    #[test]
    fn test_differentiable_rotation_has_gradient() {
        type Ad = Autodiff<NdArray>;
        let device = Default::default();
        let q = Tensor::<Ad, 2>::from_data(
            TensorData::new(vec![0.1f32, 0.2, 0.3, 0.9], [1, 4]),
            &device,
        )
        .require_grad();

        let rotation = quaternion_to_rotation(sanitize_quaternion(q.clone())).unwrap();
        let grads = rotation.slice([0..1, 1..2]).sum().backward();
        let grad = q.grad(&grads).unwrap();

        let values = grad.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().any(|v| v.abs() > 1e-6));
    }
}
