//! Loss functions for pose refinement.
//!
//! - Matching loss: mean L1 distance between an object's points placed by the
//!   ground-truth pose and by the refined pose

mod matching;

pub use matching::MatchingLoss;
