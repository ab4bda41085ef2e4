//! Core types for refine_core geometry.
//!
//! Provides the point type and the small fixed-size matrix aliases used by
//! poses and quaternions.

use core::ops::{Add, Sub};

/// Row-major 3x3 matrix.
pub type Mat3 = [[f32; 3]; 3];

/// The 3x3 identity matrix.
pub const IDENTITY_MAT3: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// A 3D point with named fields for clarity.
///
/// Provides arithmetic operations and conversions to/from arrays.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Point3 {
    /// Create a new Point3.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Convert to an array.
    #[inline]
    pub const fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Sum of the absolute values of the components (L1 norm).
    #[inline]
    pub fn l1_norm(self) -> f32 {
        libm::fabsf(self.x) + libm::fabsf(self.y) + libm::fabsf(self.z)
    }

    /// Row vector times matrix: `[x y z] · m`.
    ///
    /// This is the convention used by the matching loss, where each point is
    /// right-multiplied by the rotation block.
    #[inline]
    pub fn mul_row(self, m: &Mat3) -> Self {
        Self {
            x: self.x * m[0][0] + self.y * m[1][0] + self.z * m[2][0],
            y: self.x * m[0][1] + self.y * m[1][1] + self.z * m[2][1],
            z: self.x * m[0][2] + self.y * m[1][2] + self.z * m[2][2],
        }
    }
}

impl From<[f32; 3]> for Point3 {
    #[inline]
    fn from(arr: [f32; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
        }
    }
}

impl From<Point3> for [f32; 3] {
    #[inline]
    fn from(p: Point3) -> Self {
        p.as_array()
    }
}

impl Add for Point3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Point3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

/// Determinant of a 3x3 matrix.
pub fn det3(m: &Mat3) -> f32 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point3_arithmetic() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Point3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Point3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_point3_l1_norm() {
        let p = Point3::new(-1.0, 2.0, -3.0);
        assert_eq!(p.l1_norm(), 6.0);
        assert_eq!(Point3::default().l1_norm(), 0.0);
    }

    #[test]
    fn test_mul_row_identity() {
        let p = Point3::new(0.3, -1.2, 4.5);
        assert_eq!(p.mul_row(&IDENTITY_MAT3), p);
    }

    #[test]
    fn test_mul_row_is_row_convention() {
        // Rotation of +90 degrees about z in column convention.
        let rz: Mat3 = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let p = Point3::new(1.0, 0.0, 0.0);

        // Row convention applies the transpose: x-axis goes to -y.
        assert_eq!(p.mul_row(&rz), Point3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_det3() {
        assert_eq!(det3(&IDENTITY_MAT3), 1.0);
        let scaled: Mat3 = [[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]];
        assert_eq!(det3(&scaled), 24.0);
    }
}
