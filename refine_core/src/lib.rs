//! # refine_core
//!
//! Pure rigid-pose math for learned pose refinement.
//!
//! This crate provides the numerics the refinement trainer relies on, with no
//! tensor library attached, so that every rule of the loss can be checked on the
//! host in isolation.
//!
//! ## Features
//!
//! - **no_std compatible**: Works in embedded environments with the `alloc` feature
//! - **Quaternion sanitization**: NaN/Inf components are clamped before conversion
//! - **Row-vector poses**: `p · R + t`, the convention of the matching loss
//! - **Matching loss**: host reference for the point-cloud L1 loss
//! - **Gating**: hard-threshold outlier filter and best-loss checkpoint policy
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables standard library support
//! - `alloc`: Enables heap allocation (Vec, sampling) without full std
//!
//! ## Modules
//!
//! - [`types`]: `Point3` and 3x3 matrix helpers
//! - [`quaternion`]: `[x, y, z, w]` quaternions, sanitization and conversions
//! - [`pose`]: rigid poses and the refinement composer
//! - [`matching`]: point subsampling and the matching loss
//! - [`gate`]: outlier gate and checkpoint policy
//! - [`error`]: Error types
//!
//! ## Usage
//!
//! ```ignore
//! use refine_core::prelude::*;
//!
//! let refined = compose_pose(Quaternion::new(f32::NAN, 0.0, 0.0, 1.0), [0.01, 0.02], 0.7)?;
//! let loss = matching_loss(&mut rng, &cloud, &truth, &refined, DEFAULT_NUM_POINTS)?;
//! if gate.admit(loss as f64) == GateDecision::Keep {
//!     // backpropagate and accumulate
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Conditional std/alloc support
#[cfg(feature = "std")]
extern crate std;

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;

// Internal alloc prelude for conditional compilation
#[cfg(feature = "std")]
mod alloc_prelude {
    pub use std::vec::Vec;
}

#[cfg(all(feature = "alloc", not(feature = "std")))]
mod alloc_prelude {
    pub use alloc::vec::Vec;
}

pub mod error;
pub mod gate;
#[cfg(any(feature = "std", feature = "alloc"))]
pub mod matching;
pub mod pose;
pub mod quaternion;
pub mod types;

/// Prelude module for convenient imports.
///
/// Provides the most commonly used types and functions.
pub mod prelude {
    pub use crate::error::RefineCoreError;
    pub use crate::gate::{
        CheckpointPolicy, GateDecision, Improvement, OutlierGate, DEFAULT_OUTLIER_THRESHOLD,
    };
    pub use crate::pose::{compose_pose, Pose, PoseCorrection};
    pub use crate::quaternion::Quaternion;
    pub use crate::types::{Mat3, Point3, IDENTITY_MAT3};

    #[cfg(any(feature = "std", feature = "alloc"))]
    pub use crate::matching::{
        matching_loss, matching_loss_at, sample_indices, DEFAULT_NUM_POINTS,
    };
}

// Re-export everything at crate root for convenience
pub use error::{RefineCoreError, Result};
pub use gate::{CheckpointPolicy, GateDecision, Improvement, OutlierGate, DEFAULT_OUTLIER_THRESHOLD};
#[cfg(any(feature = "std", feature = "alloc"))]
pub use matching::{matching_loss, matching_loss_at, sample_indices, DEFAULT_NUM_POINTS};
pub use pose::{compose_pose, Pose, PoseCorrection};
pub use quaternion::{Quaternion, SANITIZED_COMPONENT};
pub use types::{det3, Mat3, Point3, IDENTITY_MAT3};
