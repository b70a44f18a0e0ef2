//! Directory-backed asset store

use super::{key_segments, AssetError, AssetStore, AssetStream};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Serves assets from a directory on disk
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    /// Open a store rooted at `root`; the directory must exist
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("asset root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a bundle key to a file inside the root
    fn locate(&self, path: &str) -> Result<PathBuf, AssetError> {
        let Some(segments) = key_segments(path) else {
            tracing::warn!(path, "Path traversal attempt blocked");
            return Err(AssetError::OutsideBundle(path.to_string()));
        };

        let file_path = segments
            .iter()
            .fold(self.root.clone(), |acc, seg| acc.join(seg));

        // Symlinks may still point outside the root
        let canonical = file_path
            .canonicalize()
            .map_err(|e| AssetError::from_io(path, e))?;
        if !canonical.starts_with(&self.root) {
            tracing::warn!(
                path,
                target_path = %canonical.display(),
                "Asset symlink escapes bundle root"
            );
            return Err(AssetError::OutsideBundle(path.to_string()));
        }
        if canonical.is_dir() {
            return Err(AssetError::NotFound(path.to_string()));
        }
        Ok(canonical)
    }
}

impl AssetStore for DirAssetStore {
    fn open(&self, path: &str) -> Result<AssetStream, AssetError> {
        let file_path = self.locate(path)?;
        let file = File::open(&file_path).map_err(|e| AssetError::from_io(path, e))?;
        let len = file.metadata().ok().map(|m| m.len());
        Ok(AssetStream::new(BufReader::new(file), len))
    }

    fn exists(&self, path: &str) -> bool {
        self.locate(path).is_ok()
    }
}
