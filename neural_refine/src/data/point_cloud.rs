//! Object point clouds and the `.xyz` loader.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use refine_core::Point3;

use crate::error::{NeuralRefineError, Result};

/// File name of an object's point cloud inside its label directory.
pub const POINT_CLOUD_FILE: &str = "object.xyz";

/// An object's point cloud in model coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    /// Point positions.
    pub points: Vec<Point3>,
}

impl PointCloud {
    /// Create a new point cloud from points.
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Parse `.xyz` text.
    ///
    /// The first line is a header and is skipped. Blank lines are ignored.
    /// Every other row must hold at least three whitespace-separated numbers;
    /// only the first three are used. `path` is only used for error messages.
    pub fn parse_xyz(text: &str, path: &Path) -> Result<Self> {
        let mut points = Vec::new();

        for (idx, line) in text.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parse_err = |message: String| NeuralRefineError::PointCloudParse {
                path: path.to_path_buf(),
                line: idx + 1,
                message,
            };

            let mut coords = [0.0f32; 3];
            let mut columns = line.split_whitespace();
            for (axis, slot) in coords.iter_mut().enumerate() {
                let token = columns.next().ok_or_else(|| {
                    parse_err(format!("expected at least 3 columns, found {axis}"))
                })?;
                *slot = token
                    .parse()
                    .map_err(|e| parse_err(format!("column {}: {token:?}: {e}", axis + 1)))?;
            }

            points.push(Point3::from(coords));
        }

        Ok(Self { points })
    }

    /// Load a point cloud from an `.xyz` file.
    pub fn load_xyz(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| NeuralRefineError::io(path, e))?;
        Self::parse_xyz(&text, path)
    }
}

/// Resolves labels to point clouds under a dataset root.
///
/// By default every call reads the file again. With caching enabled the cloud
/// is kept after the first read, which gives identical results since the files
/// do not change during a run.
#[derive(Debug)]
pub struct PointCloudStore {
    root_dir: PathBuf,
    cache: Option<HashMap<String, Arc<PointCloud>>>,
}

impl PointCloudStore {
    /// Create a store reading `<root_dir>/<label>/object.xyz`.
    pub fn new(root_dir: impl Into<PathBuf>, cache: bool) -> Self {
        Self {
            root_dir: root_dir.into(),
            cache: cache.then(HashMap::new),
        }
    }

    /// Path of the point cloud for `label`.
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.root_dir.join(label).join(POINT_CLOUD_FILE)
    }

    /// Number of cached clouds.
    pub fn cached_labels(&self) -> usize {
        self.cache.as_ref().map_or(0, HashMap::len)
    }

    /// Load the point cloud for `label`.
    pub fn load(&mut self, label: &str) -> Result<Arc<PointCloud>> {
        let path = self.path_for(label);

        match self.cache.as_mut() {
            Some(cache) => {
                if let Some(cloud) = cache.get(label) {
                    return Ok(Arc::clone(cloud));
                }
                let cloud = Arc::new(PointCloud::load_xyz(&path)?);
                log::debug!("Cached {} points for '{}'", cloud.len(), label);
                cache.insert(label.to_string(), Arc::clone(&cloud));
                Ok(cloud)
            }
            None => Ok(Arc::new(PointCloud::load_xyz(&path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_cloud(root: &Path, label: &str, body: &str) {
        let dir = root.join(label);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(POINT_CLOUD_FILE), body).unwrap();
    }

    #[test]
    fn test_parse_skips_header_and_blank_lines() {
        let text = "x y z nx ny nz\n0.1 0.2 0.3 0 0 1\n\n  -1 2e-3 4  \n";
        let cloud = PointCloud::parse_xyz(text, Path::new("t.xyz")).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[0], Point3::new(0.1, 0.2, 0.3));
        assert_eq!(cloud.points[1], Point3::new(-1.0, 0.002, 4.0));
    }

    #[test]
    fn test_parse_header_only() {
        let cloud = PointCloud::parse_xyz("header\n", Path::new("t.xyz")).unwrap();
        assert!(cloud.is_empty());
    }

    #[test]
    fn test_parse_short_row_reports_line() {
        let text = "header\n1 2 3\n4 5\n";
        let err = PointCloud::parse_xyz(text, Path::new("t.xyz")).unwrap_err();

        match err {
            NeuralRefineError::PointCloudParse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_non_numeric() {
        let text = "header\n1 two 3\n";
        let err = PointCloud::parse_xyz(text, Path::new("t.xyz")).unwrap_err();
        assert!(err.to_string().contains("t.xyz:2"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PointCloudStore::new(dir.path(), false);

        let err = store.load("nothing").unwrap_err();
        assert!(matches!(err, NeuralRefineError::Io { .. }));
    }

    #[test]
    fn test_store_reads_label_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_cloud(dir.path(), "ape", "h\n1 2 3\n");
        let mut store = PointCloudStore::new(dir.path(), false);

        let cloud = store.load("ape").unwrap();
        assert_eq!(cloud.points, vec![Point3::new(1.0, 2.0, 3.0)]);
        assert_eq!(store.cached_labels(), 0);
    }

    #[test]
    fn test_cache_returns_first_read() {
        let dir = tempfile::tempdir().unwrap();
        write_cloud(dir.path(), "ape", "h\n1 2 3\n");
        let mut store = PointCloudStore::new(dir.path(), true);

        let first = store.load("ape").unwrap();
        write_cloud(dir.path(), "ape", "h\n9 9 9\n");
        let second = store.load("ape").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.cached_labels(), 1);
    }
}
