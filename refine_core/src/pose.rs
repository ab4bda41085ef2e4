//! Rigid poses and the refinement composer.
//!
//! A [`Pose`] is a 3x3 rotation block plus a translation, the top three rows of
//! a homogeneous 4x4 transform. Points are transformed in row-vector convention
//! (`p · R + t`), which is the convention the matching loss is defined in.

use crate::error::{RefineCoreError, Result};
use crate::quaternion::Quaternion;
use crate::types::{Mat3, Point3, IDENTITY_MAT3};

/// A rigid transform: rotation block and translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Row-major 3x3 rotation block.
    pub rotation: Mat3,
    /// Translation column.
    pub translation: Point3,
}

impl Pose {
    /// The identity pose.
    pub const IDENTITY: Self = Self {
        rotation: IDENTITY_MAT3,
        translation: Point3::new(0.0, 0.0, 0.0),
    };

    /// Create a pose from its blocks.
    #[inline]
    pub const fn new(rotation: Mat3, translation: Point3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a pose from the top three rows of a homogeneous matrix.
    pub fn from_matrix_3x4(m: [[f32; 4]; 3]) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        for (dst, src) in rotation.iter_mut().zip(m.iter()) {
            dst.copy_from_slice(&src[0..3]);
        }
        Self {
            rotation,
            translation: Point3::new(m[0][3], m[1][3], m[2][3]),
        }
    }

    /// Create a pose from 3 or 4 rows of at least 4 columns.
    ///
    /// The fourth row of a homogeneous matrix is ignored.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        if rows.len() != 3 && rows.len() != 4 {
            let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
            return Err(RefineCoreError::InvalidMatrixShape {
                rows: rows.len(),
                cols,
            });
        }

        let mut m = [[0.0f32; 4]; 3];
        for (dst, src) in m.iter_mut().zip(rows.iter()) {
            let src = src.as_ref();
            if src.len() != 4 {
                return Err(RefineCoreError::InvalidMatrixShape {
                    rows: rows.len(),
                    cols: src.len(),
                });
            }
            dst.copy_from_slice(src);
        }
        Ok(Self::from_matrix_3x4(m))
    }

    /// The pose as a 3x4 matrix `[R | t]`.
    pub fn to_matrix_3x4(&self) -> [[f32; 4]; 3] {
        let t = self.translation.as_array();
        let mut m = [[0.0; 4]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            row[0..3].copy_from_slice(&self.rotation[i]);
            row[3] = t[i];
        }
        m
    }

    /// Row-major values of the 3x4 matrix, the layout fed to the network.
    pub fn to_flat_3x4(&self) -> [f32; 12] {
        let m = self.to_matrix_3x4();
        let mut flat = [0.0; 12];
        for (i, row) in m.iter().enumerate() {
            flat[i * 4..i * 4 + 4].copy_from_slice(row);
        }
        flat
    }

    /// Transform a point in row-vector convention: `p · R + t`.
    #[inline]
    pub fn transform_point(&self, p: Point3) -> Point3 {
        p.mul_row(&self.rotation) + self.translation
    }

    /// Rotation block as a quaternion (sign arbitrary).
    pub fn rotation_quaternion(&self) -> Quaternion {
        Quaternion::from_rotation_matrix(&self.rotation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Raw refiner output for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseCorrection {
    /// Rotation quaternion `[x, y, z, w]`, possibly non-finite.
    pub rotation: Quaternion,
    /// Planar translation `(x, y)`.
    pub xy: [f32; 2],
    /// Depth translation.
    pub z: f32,
}

impl PoseCorrection {
    /// Create a correction from network outputs.
    pub const fn new(rotation: Quaternion, xy: [f32; 2], z: f32) -> Self {
        Self { rotation, xy, z }
    }

    /// The correction that reproduces `pose` exactly.
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            rotation: pose.rotation_quaternion(),
            xy: [pose.translation.x, pose.translation.y],
            z: pose.translation.z,
        }
    }

    /// Build the refined pose.
    ///
    /// The quaternion is sanitized (non-finite components become `1.0`) and
    /// converted to a rotation block; the translation is `(x, y, z)` taken
    /// verbatim. Nothing of the pose the network was conditioned on survives:
    /// refinement replaces the rotation and translation rather than adding to them.
    pub fn compose(&self) -> Result<Pose> {
        let rotation = self.rotation.sanitized().to_rotation_matrix()?;
        Ok(Pose {
            rotation,
            translation: Point3::new(self.xy[0], self.xy[1], self.z),
        })
    }
}

/// Compose a refined pose from network outputs; see [`PoseCorrection::compose`].
pub fn compose_pose(rotation: Quaternion, xy: [f32; 2], z: f32) -> Result<Pose> {
    PoseCorrection::new(rotation, xy, z).compose()
}
