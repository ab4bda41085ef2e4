//! Data loading and preprocessing for training.
//!
//! - [`PointCloud`] / [`PointCloudStore`]: per-label object clouds (`object.xyz`)
//! - [`SampleSource`]: indexed supplier of [`SampleRecord`]s
//! - [`DirectoryDataset`]: the on-disk image/pose dataset
//! - [`DatasetSplit`]: train/validation split

mod directory;
mod image_data;
mod point_cloud;
mod sample;
mod split;

pub use directory::{DirectoryDataset, MANIFEST_FILE, REFINEMENT_DIR};
pub use image_data::{ImageData, IMAGENET_MEAN, IMAGENET_STD, IMAGE_SIZE};
pub use point_cloud::{PointCloud, PointCloudStore, POINT_CLOUD_FILE};
pub use sample::{pose_tensor, InMemorySource, PoseSample, SampleRecord, SampleSource};
pub use split::{epoch_order, DatasetSplit};
