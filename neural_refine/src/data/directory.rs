//! On-disk dataset of observed/rendered image pairs.
//!
//! Layout, per class label:
//!
//! ```text
//! <root_dir>/<label>/object.xyz
//! <root_dir>/<label>/pose_refinement/poses.json
//! <root_dir>/<label>/pose_refinement/observed/<id>.png
//! <root_dir>/<label>/pose_refinement/rendered/<id>.png
//! ```
//!
//! `poses.json` is an array of `{ "id", "true_pose", "pred_pose" }` entries with
//! poses given as 3x4 or 4x4 row-major matrices.

use std::fs;
use std::path::{Path, PathBuf};

use refine_core::Pose;
use serde::Deserialize;

use super::image_data::{ImageData, IMAGE_SIZE};
use super::sample::{SampleRecord, SampleSource};
use crate::error::{NeuralRefineError, Result};

/// Directory holding a label's refinement data.
pub const REFINEMENT_DIR: &str = "pose_refinement";

/// Manifest file name inside [`REFINEMENT_DIR`].
pub const MANIFEST_FILE: &str = "poses.json";

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    true_pose: Vec<Vec<f32>>,
    pred_pose: Vec<Vec<f32>>,
}

#[derive(Debug, Clone)]
struct IndexedEntry {
    label: String,
    id: String,
    true_pose: Pose,
    pred_pose: Pose,
}

/// Samples for a set of classes, indexed up front and decoded lazily.
///
/// Manifests and poses are parsed when the dataset is opened, so malformed
/// poses fail before training starts. Images are decoded on every [`get`].
///
/// [`get`]: SampleSource::get
#[derive(Debug, Clone)]
pub struct DirectoryDataset {
    root_dir: PathBuf,
    image_size: u32,
    entries: Vec<IndexedEntry>,
}

impl DirectoryDataset {
    /// Index the manifests of `classes` under `root_dir`.
    pub fn open<S: AsRef<str>>(root_dir: impl Into<PathBuf>, classes: &[S]) -> Result<Self> {
        let root_dir = root_dir.into();
        let mut entries = Vec::new();

        for label in classes {
            let label = label.as_ref();
            let path = root_dir.join(label).join(REFINEMENT_DIR).join(MANIFEST_FILE);
            let raw = fs::read(&path).map_err(|e| NeuralRefineError::io(&path, e))?;
            let manifest: Vec<ManifestEntry> =
                serde_json::from_slice(&raw).map_err(|e| NeuralRefineError::json(&path, e))?;

            log::debug!("{}: {} samples", path.display(), manifest.len());

            for entry in manifest {
                entries.push(IndexedEntry {
                    label: label.to_string(),
                    true_pose: Pose::from_rows(&entry.true_pose)?,
                    pred_pose: Pose::from_rows(&entry.pred_pose)?,
                    id: entry.id,
                });
            }
        }

        log::info!(
            "Indexed {} samples across {} classes under {}",
            entries.len(),
            classes.len(),
            root_dir.display()
        );

        Ok(Self {
            root_dir,
            image_size: IMAGE_SIZE,
            entries,
        })
    }

    /// Override the side length images are resized to.
    pub fn with_image_size(mut self, image_size: u32) -> Self {
        self.image_size = image_size;
        self
    }

    /// Side length images are resized to.
    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    fn image_path(&self, label: &str, kind: &str, id: &str) -> PathBuf {
        self.root_dir
            .join(label)
            .join(REFINEMENT_DIR)
            .join(kind)
            .join(format!("{id}.png"))
    }

    fn load_image(&self, path: &Path) -> Result<ImageData> {
        if !path.exists() {
            return Err(NeuralRefineError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "image file missing"),
            ));
        }
        ImageData::load(path, self.image_size)
    }
}

impl SampleSource for DirectoryDataset {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Result<SampleRecord> {
        let entry = self
            .entries
            .get(index)
            .ok_or(NeuralRefineError::SampleOutOfRange {
                index,
                len: self.entries.len(),
            })?;

        let observed = self.load_image(&self.image_path(&entry.label, "observed", &entry.id))?;
        let rendered = self.load_image(&self.image_path(&entry.label, "rendered", &entry.id))?;

        Ok(SampleRecord {
            label: entry.label.clone(),
            observed,
            rendered,
            true_pose: entry.true_pose,
            pred_pose: entry.pred_pose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use refine_core::Point3;

    fn write_class(root: &Path, label: &str, ids: &[&str]) {
        let dir = root.join(label).join(REFINEMENT_DIR);
        fs::create_dir_all(dir.join("observed")).unwrap();
        fs::create_dir_all(dir.join("rendered")).unwrap();

        let mut manifest = Vec::new();
        for id in ids {
            for kind in ["observed", "rendered"] {
                RgbImage::from_pixel(12, 9, Rgb([40, 80, 120]))
                    .save(dir.join(kind).join(format!("{id}.png")))
                    .unwrap();
            }
            manifest.push(serde_json::json!({
                "id": id,
                "true_pose": [[1, 0, 0, 0.1], [0, 1, 0, 0.2], [0, 0, 1, 0.9]],
                "pred_pose": [[1, 0, 0, 0.0], [0, 1, 0, 0.0], [0, 0, 1, 1.0], [0, 0, 0, 1]],
            }));
        }
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_open_indexes_all_classes() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), "ape", &["0000", "0001"]);
        write_class(dir.path(), "can", &["0000"]);

        let dataset = DirectoryDataset::open(dir.path(), &["ape", "can"]).unwrap();
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_get_loads_and_resizes_images() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), "ape", &["0007"]);

        let dataset = DirectoryDataset::open(dir.path(), &["ape"])
            .unwrap()
            .with_image_size(16);
        let sample = dataset.get(0).unwrap();

        assert_eq!(sample.label, "ape");
        assert_eq!((sample.observed.height, sample.observed.width), (16, 16));
        assert_eq!(sample.true_pose.translation, Point3::new(0.1, 0.2, 0.9));
        assert_eq!(sample.pred_pose.translation, Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryDataset::open(dir.path(), &["ape"]).unwrap_err();
        assert!(matches!(err, NeuralRefineError::Io { .. }));
    }

    #[test]
    fn test_bad_pose_shape_fails_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ape").join(REFINEMENT_DIR);
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join(MANIFEST_FILE),
            r#"[{"id": "0", "true_pose": [[1, 0, 0]], "pred_pose": [[1, 0, 0]]}]"#,
        )
        .unwrap();

        let err = DirectoryDataset::open(dir.path(), &["ape"]).unwrap_err();
        assert!(matches!(err, NeuralRefineError::Core(_)));
    }

    #[test]
    fn test_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), "ape", &["0000"]);
        fs::remove_file(
            dir.path()
                .join("ape")
                .join(REFINEMENT_DIR)
                .join("rendered")
                .join("0000.png"),
        )
        .unwrap();

        let dataset = DirectoryDataset::open(dir.path(), &["ape"]).unwrap();
        assert!(dataset.get(0).is_err());
    }
}
