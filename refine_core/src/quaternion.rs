//! Rotation quaternions in `[x, y, z, w]` order.
//!
//! Quaternions coming out of the refiner network are raw regression outputs:
//! they are not unit length and, early in training, may hold NaN or infinite
//! components. [`Quaternion::sanitized`] applies the training-time tolerance
//! policy (every non-finite component becomes `1.0`) and
//! [`Quaternion::to_rotation_matrix`] normalises before converting.

use crate::error::{RefineCoreError, Result};
use crate::types::Mat3;

/// Value substituted for non-finite quaternion components.
pub const SANITIZED_COMPONENT: f32 = 1.0;

/// A rotation quaternion stored as `[x, y, z, w]` (scalar last).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    /// Vector part, x component.
    pub x: f32,
    /// Vector part, y component.
    pub y: f32,
    /// Vector part, z component.
    pub z: f32,
    /// Scalar part.
    pub w: f32,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create a quaternion from its components.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Create a quaternion from an `[x, y, z, w]` array.
    #[inline]
    pub const fn from_xyzw(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Components as `[x, y, z, w]`.
    #[inline]
    pub const fn to_xyzw(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Largest absolute component.
    #[inline]
    pub fn max_abs(self) -> f32 {
        self.to_xyzw()
            .iter()
            .fold(0.0f32, |acc, c| acc.max(libm::fabsf(*c)))
    }

    /// Euclidean norm.
    ///
    /// Components are scaled by the largest magnitude before squaring, so
    /// finite inputs near the ends of the `f32` range do not overflow or
    /// flush to zero.
    pub fn norm(self) -> f32 {
        let scale = self.max_abs();
        if scale == 0.0 || !scale.is_finite() {
            return scale;
        }
        let [x, y, z, w] = self.to_xyzw().map(|c| c / scale);
        scale * libm::sqrtf(x * x + y * y + z * z + w * w)
    }

    /// Returns true if every component is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.to_xyzw().iter().all(|c| c.is_finite())
    }

    /// Replace every NaN or infinite component with `1.0`.
    ///
    /// This is a clamp, not a renormalisation: the result is generally not a
    /// unit quaternion and is only meaningful after the normalisation done by
    /// [`Quaternion::to_rotation_matrix`].
    pub fn sanitized(self) -> Self {
        let fix = |c: f32| if c.is_finite() { c } else { SANITIZED_COMPONENT };
        Self::new(fix(self.x), fix(self.y), fix(self.z), fix(self.w))
    }

    /// Unit quaternion in the same direction.
    ///
    /// Fails only for the zero quaternion or one with a NaN or infinite
    /// component. Any other finite input normalises, however large or small.
    pub fn normalized(self) -> Result<Self> {
        if !self.is_finite() {
            return Err(RefineCoreError::DegenerateQuaternion { norm: self.norm() });
        }
        let scale = self.max_abs();
        if scale == 0.0 {
            return Err(RefineCoreError::DegenerateQuaternion { norm: 0.0 });
        }

        let [x, y, z, w] = self.to_xyzw().map(|c| c / scale);
        let norm = libm::sqrtf(x * x + y * y + z * z + w * w);
        Ok(Self::new(x / norm, y / norm, z / norm, w / norm))
    }

    /// Convert to a row-major rotation matrix.
    ///
    /// The quaternion is normalised first. Fails for the zero quaternion and
    /// for non-finite components.
    pub fn to_rotation_matrix(self) -> Result<Mat3> {
        let Self { x, y, z, w } = self.normalized()?;

        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (xw, yw, zw) = (x * w, y * w, z * w);

        Ok([
            [1.0 - 2.0 * (yy + zz), 2.0 * (xy - zw), 2.0 * (xz + yw)],
            [2.0 * (xy + zw), 1.0 - 2.0 * (xx + zz), 2.0 * (yz - xw)],
            [2.0 * (xz - yw), 2.0 * (yz + xw), 1.0 - 2.0 * (xx + yy)],
        ])
    }

    /// Recover a unit quaternion from a rotation matrix.
    ///
    /// Uses the largest-diagonal branch for numerical stability. The sign of the
    /// result is arbitrary (`q` and `-q` describe the same rotation).
    pub fn from_rotation_matrix(m: &Mat3) -> Self {
        let trace = m[0][0] + m[1][1] + m[2][2];

        let q = if trace > 0.0 {
            let s = libm::sqrtf(trace + 1.0) * 2.0;
            Self::new(
                (m[2][1] - m[1][2]) / s,
                (m[0][2] - m[2][0]) / s,
                (m[1][0] - m[0][1]) / s,
                0.25 * s,
            )
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = libm::sqrtf(1.0 + m[0][0] - m[1][1] - m[2][2]) * 2.0;
            Self::new(
                0.25 * s,
                (m[0][1] + m[1][0]) / s,
                (m[0][2] + m[2][0]) / s,
                (m[2][1] - m[1][2]) / s,
            )
        } else if m[1][1] > m[2][2] {
            let s = libm::sqrtf(1.0 + m[1][1] - m[0][0] - m[2][2]) * 2.0;
            Self::new(
                (m[0][1] + m[1][0]) / s,
                0.25 * s,
                (m[1][2] + m[2][1]) / s,
                (m[0][2] - m[2][0]) / s,
            )
        } else {
            let s = libm::sqrtf(1.0 + m[2][2] - m[0][0] - m[1][1]) * 2.0;
            Self::new(
                (m[0][2] + m[2][0]) / s,
                (m[1][2] + m[2][1]) / s,
                0.25 * s,
                (m[1][0] - m[0][1]) / s,
            )
        };

        q.normalized().unwrap_or(Self::IDENTITY)
    }

    /// Absolute dot product; `1.0` means the two unit quaternions encode the same rotation.
    #[inline]
    pub fn abs_dot(self, other: Self) -> f32 {
        libm::fabsf(self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f32; 4]> for Quaternion {
    #[inline]
    fn from(v: [f32; 4]) -> Self {
        Self::from_xyzw(v)
    }
}
