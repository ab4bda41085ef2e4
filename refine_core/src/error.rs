//! Error types for refine_core operations.
//!
//! Provides a simple error enum with no external dependencies for no_std compatibility.

use core::fmt;

/// Error types that can occur during refine_core operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefineCoreError {
    /// A quaternion with zero or non-finite norm cannot be turned into a rotation.
    DegenerateQuaternion {
        /// Norm of the offending quaternion.
        norm: f32,
    },
    /// The point cloud holds fewer points than the loss samples.
    InsufficientPoints {
        /// Points required by the sampler.
        required: usize,
        /// Points available in the cloud.
        available: usize,
    },
    /// A pose matrix did not have a 3x4 or 4x4 shape.
    InvalidMatrixShape {
        /// Number of rows found.
        rows: usize,
        /// Number of columns found in the first short row (or the first row).
        cols: usize,
    },
}

impl fmt::Display for RefineCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefineCoreError::DegenerateQuaternion { norm } => {
                write!(f, "cannot convert quaternion with norm {} to a rotation", norm)
            }
            RefineCoreError::InsufficientPoints {
                required,
                available,
            } => {
                write!(
                    f,
                    "point cloud has {} points but {} are required",
                    available, required
                )
            }
            RefineCoreError::InvalidMatrixShape { rows, cols } => {
                write!(
                    f,
                    "pose matrix must be 3x4 or 4x4, got {}x{}",
                    rows, cols
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RefineCoreError {}

/// Result type for refine_core operations.
pub type Result<T> = core::result::Result<T, RefineCoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "std")]
    #[test]
    fn test_error_display() {
        use std::format;

        let err = RefineCoreError::InsufficientPoints {
            required: 3000,
            available: 120,
        };
        assert_eq!(
            format!("{}", err),
            "point cloud has 120 points but 3000 are required"
        );

        let err = RefineCoreError::InvalidMatrixShape { rows: 2, cols: 4 };
        assert_eq!(format!("{}", err), "pose matrix must be 3x4 or 4x4, got 2x4");

        let err = RefineCoreError::DegenerateQuaternion { norm: 0.0 };
        assert_eq!(
            format!("{}", err),
            "cannot convert quaternion with norm 0 to a rotation"
        );
    }

    #[test]
    fn test_error_equality() {
        let a = RefineCoreError::InsufficientPoints {
            required: 3000,
            available: 10,
        };
        let b = RefineCoreError::InsufficientPoints {
            required: 3000,
            available: 10,
        };
        let c = RefineCoreError::DegenerateQuaternion { norm: 0.0 };

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
