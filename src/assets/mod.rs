//! Bundled asset store
//!
//! Read-only keyed access to the asset bundle. Keys are `/`-separated paths
//! relative to the bundle root, e.g. `dist/app.js`.

mod dir;
mod memory;

pub use dir::DirAssetStore;
pub use memory::MemoryAssetStore;

use hyper::body::Bytes;
use std::fmt;
use std::io::{self, Cursor, Read};
use thiserror::Error;

/// Failure to open an asset
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("asset path escapes the bundle: {0}")]
    OutsideBundle(String),

    #[error("failed to read asset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl AssetError {
    /// Whether the failure should be reported as a missing asset
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::OutsideBundle(_))
    }

    fn from_io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_string())
        } else {
            Self::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// An owned, read-once byte stream over one asset
///
/// Whoever holds the stream consumes it; moving it into `into_bytes` or
/// reading it to the end are the only ways to get at the content.
pub struct AssetStream {
    inner: Box<dyn Read + Send>,
    len_hint: Option<u64>,
}

impl AssetStream {
    pub fn new(reader: impl Read + Send + 'static, len_hint: Option<u64>) -> Self {
        Self {
            inner: Box::new(reader),
            len_hint,
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        Self::new(Cursor::new(bytes), Some(len))
    }

    /// Size reported by the store when known up front
    pub const fn len_hint(&self) -> Option<u64> {
        self.len_hint
    }

    /// Drain the stream into a contiguous buffer
    pub fn into_bytes(mut self) -> io::Result<Bytes> {
        let capacity = self
            .len_hint
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);
        self.inner.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl Read for AssetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl fmt::Debug for AssetStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetStream")
            .field("len_hint", &self.len_hint)
            .finish_non_exhaustive()
    }
}

/// Read-only asset lookup
pub trait AssetStore: Send + Sync {
    /// Open `path` for reading
    fn open(&self, path: &str) -> Result<AssetStream, AssetError>;

    /// Whether `path` names an openable asset
    fn exists(&self, path: &str) -> bool;
}

/// Split a bundle key into its segments, rejecting anything that could
/// climb out of the bundle root.
fn key_segments(path: &str) -> Option<Vec<&str>> {
    if path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return None;
    }
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.iter().any(|s| *s == "..") {
        return None;
    }
    Some(segments)
}
