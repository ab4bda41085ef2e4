//! Configuration types for neural_refine.
//!
//! Burn-style configuration structs for the refiner network and the trainer.
//! All of them serialize to JSON through [`burn::config::Config`].

mod network;
mod training;

pub use network::{ImageEncoderConfig, PoseRefinerConfig};
pub use training::TrainingConfig;
