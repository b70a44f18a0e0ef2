//! In-memory asset store
//!
//! Useful for unit tests and for bundles compiled into the binary.

use super::{key_segments, AssetError, AssetStore, AssetStream};
use hyper::body::Bytes;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    files: BTreeMap<String, Bytes>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Bytes>) {
        self.files.insert(path.into(), content.into());
    }

    /// Builder-style `insert`
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn get(&self, path: &str) -> Result<&Bytes, AssetError> {
        let segments =
            key_segments(path).ok_or_else(|| AssetError::OutsideBundle(path.to_string()))?;
        self.files
            .get(&segments.join("/"))
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}

impl AssetStore for MemoryAssetStore {
    fn open(&self, path: &str) -> Result<AssetStream, AssetError> {
        // Bytes clones share the buffer
        self.get(path).map(|b| AssetStream::from_bytes(b.clone()))
    }

    fn exists(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_normalize() {
        let store = MemoryAssetStore::new().with("dist/app.js", "console.log(1)");
        assert_eq!(store.len(), 1);
        let bytes = store.open("dist//app.js").unwrap().into_bytes().unwrap();
        assert_eq!(&bytes[..], b"console.log(1)");
    }

    #[test]
    fn test_missing_and_traversal() {
        let store = MemoryAssetStore::new().with("dist/app.js", "x");
        assert!(matches!(
            store.open("dist/other.js").unwrap_err(),
            AssetError::NotFound(_)
        ));
        assert!(matches!(
            store.open("dist/../dist/app.js").unwrap_err(),
            AssetError::OutsideBundle(_)
        ));
        assert!(!store.exists("nope"));
    }
}
