//! Training samples and the sources that supply them.

use burn::prelude::*;
use burn::tensor::TensorData;
use refine_core::Pose;

use super::image_data::ImageData;
use crate::error::{NeuralRefineError, Result};

/// One sample as read from storage, before device placement.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// Object class; selects the point cloud.
    pub label: String,
    /// Observed camera image.
    pub observed: ImageData,
    /// Image rendered at the initial predicted pose.
    pub rendered: ImageData,
    /// Ground-truth pose.
    pub true_pose: Pose,
    /// Initial predicted pose the network is conditioned on.
    pub pred_pose: Pose,
}

impl SampleRecord {
    /// Move the sample onto `device`.
    pub fn to_device<B: Backend>(&self, device: &B::Device) -> PoseSample<B> {
        PoseSample {
            label: self.label.clone(),
            observed: self.observed.to_tensor(device),
            rendered: self.rendered.to_tensor(device),
            pose_input: pose_tensor(&self.pred_pose, device),
            true_pose: self.true_pose,
            pred_pose: self.pred_pose,
        }
    }
}

/// A sample whose tensors live on a training device.
#[derive(Debug, Clone)]
pub struct PoseSample<B: Backend> {
    /// Object class.
    pub label: String,
    /// Observed image, `[1, 3, H, W]`.
    pub observed: Tensor<B, 4>,
    /// Rendered image, `[1, 3, H, W]`.
    pub rendered: Tensor<B, 4>,
    /// Initial predicted pose as a row-major `[1, 12]` tensor.
    pub pose_input: Tensor<B, 2>,
    /// Ground-truth pose.
    pub true_pose: Pose,
    /// Initial predicted pose.
    pub pred_pose: Pose,
}

/// Flattened `[R | t]` of a pose as a `[1, 12]` tensor.
pub fn pose_tensor<B: Backend>(pose: &Pose, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(pose.to_flat_3x4().to_vec(), [1, 12]), device)
}

/// Indexed supplier of samples.
///
/// Implementations may read from disk on every call; the trainer asks for
/// each sample once per pass.
pub trait SampleSource {
    /// Number of samples.
    fn len(&self) -> usize;

    /// Whether the source has no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch sample `index`.
    fn get(&self, index: usize) -> Result<SampleRecord>;
}

/// Samples held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    samples: Vec<SampleRecord>,
}

impl InMemorySource {
    /// Wrap a list of samples.
    pub fn new(samples: Vec<SampleRecord>) -> Self {
        Self { samples }
    }

    /// Append a sample.
    pub fn push(&mut self, sample: SampleRecord) {
        self.samples.push(sample);
    }
}

impl From<Vec<SampleRecord>> for InMemorySource {
    fn from(samples: Vec<SampleRecord>) -> Self {
        Self::new(samples)
    }
}

impl SampleSource for InMemorySource {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Result<SampleRecord> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(NeuralRefineError::SampleOutOfRange {
                index,
                len: self.samples.len(),
            })
    }
}
