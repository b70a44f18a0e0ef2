//! Private document storage
//!
//! A single-root document tree over a directory. Documents are addressed by
//! their `/`-separated path relative to the root; the root itself is `root`.
//! Rows and flag values follow the document-provider contract the native
//! host forwards them to.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, ShellError};
use crate::http::mime;

pub const ROOT_ID: &str = "root";
pub const MIME_TYPE_DIR: &str = "vnd.android.document/directory";

/// Root flags
pub const ROOT_SUPPORTS_CREATE: u32 = 1;
pub const ROOT_SUPPORTS_IS_CHILD: u32 = 1 << 4;

/// Document flags
pub const SUPPORTS_WRITE: u32 = 1 << 1;
pub const SUPPORTS_DELETE: u32 = 1 << 2;
pub const DIR_SUPPORTS_CREATE: u32 = 1 << 3;
pub const SUPPORTS_RENAME: u32 = 1 << 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootRow {
    pub root_id: String,
    pub flags: u32,
    pub title: String,
    pub summary: String,
    pub document_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRow {
    pub document_id: String,
    pub display_name: String,
    pub size: u64,
    pub mime_type: String,
    /// Milliseconds since the Unix epoch
    pub last_modified: i64,
    pub flags: u32,
}

impl DocumentRow {
    pub const fn is_dir(&self) -> bool {
        self.flags & DIR_SUPPORTS_CREATE != 0
    }
}

/// File access modes: `r`, `w`, `wt`, `wa`, `rw`, `rwt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// `w` and `wt`: write from an emptied file
    WriteTruncate,
    WriteAppend,
    ReadWrite,
    ReadWriteTruncate,
}

impl OpenMode {
    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::Read => options.read(true),
            Self::WriteTruncate => options.write(true).truncate(true),
            Self::WriteAppend => options.append(true),
            Self::ReadWrite => options.read(true).write(true),
            Self::ReadWriteTruncate => options.read(true).write(true).truncate(true),
        };
        options
    }
}

impl FromStr for OpenMode {
    type Err = ShellError;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "r" => Ok(Self::Read),
            "w" | "wt" => Ok(Self::WriteTruncate),
            "wa" => Ok(Self::WriteAppend),
            "rw" => Ok(Self::ReadWrite),
            "rwt" => Ok(Self::ReadWriteTruncate),
            other => Err(ShellError::InvalidOpenMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    title: String,
    summary: String,
}

impl DocumentStore {
    /// Open the store, creating the root directory when missing
    pub fn new(
        root: impl AsRef<Path>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().canonicalize()?,
            title: title.into(),
            summary: summary.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn query_roots(&self) -> Vec<RootRow> {
        vec![RootRow {
            root_id: ROOT_ID.to_string(),
            flags: ROOT_SUPPORTS_CREATE | ROOT_SUPPORTS_IS_CHILD,
            title: self.title.clone(),
            summary: self.summary.clone(),
            document_id: ROOT_ID.to_string(),
        }]
    }

    pub fn query_document(&self, id: &str) -> Result<DocumentRow> {
        let path = self.path_for(id)?;
        self.row_for(&path)
    }

    /// Rows for the entries of a directory, sorted by name; empty for files
    pub fn query_children(&self, id: &str) -> Result<Vec<DocumentRow>> {
        let parent = self.path_for(id)?;
        if !parent.is_dir() {
            return Ok(Vec::new());
        }
        let mut rows = Vec::new();
        for entry in fs::read_dir(&parent)? {
            rows.push(self.row_for(&entry?.path())?);
        }
        rows.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(rows)
    }

    pub fn open(&self, id: &str, mode: OpenMode) -> Result<File> {
        let path = self.path_for(id)?;
        if path.is_dir() {
            return Err(ShellError::InvalidDocument(format!("{id} is a directory")));
        }
        Ok(mode.options().open(path)?)
    }

    pub fn read(&self, id: &str) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.open(id, OpenMode::Read)?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Replace a document's content
    pub fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        let mut file = self.open(id, OpenMode::WriteTruncate)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Create a directory or an empty file under `parent`; returns the new id
    pub fn create(&self, parent: &str, mime_type: &str, display_name: &str) -> Result<String> {
        validate_name(display_name)?;
        let parent_path = self.path_for(parent)?;
        if !parent_path.is_dir() {
            return Err(ShellError::InvalidDocument(format!(
                "{parent} is not a directory"
            )));
        }

        self.check_reserved(&parent_path, display_name)?;

        let target = parent_path.join(display_name);
        let created = if mime_type == MIME_TYPE_DIR {
            fs::create_dir(&target)
        } else {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .map(drop)
        };
        created.map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ShellError::DocumentExists(self.id_for(&target)),
            _ => ShellError::Io(e),
        })?;

        let id = self.id_for(&target);
        tracing::info!(id = %id, mime_type, "Created document");
        Ok(id)
    }

    /// Delete a document; directories are removed with their contents
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if path == self.root {
            return Err(ShellError::InvalidDocument("the root cannot be deleted".into()));
        }
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        tracing::info!(id, "Deleted document");
        Ok(())
    }

    /// Rename within the same parent; returns the new id
    pub fn rename(&self, id: &str, display_name: &str) -> Result<String> {
        validate_name(display_name)?;
        let path = self.path_for(id)?;
        let Some(parent) = path.parent().filter(|_| path != self.root) else {
            return Err(ShellError::InvalidDocument("the root cannot be renamed".into()));
        };

        self.check_reserved(parent, display_name)?;

        let target = parent.join(display_name);
        if target.exists() {
            return Err(ShellError::DocumentExists(self.id_for(&target)));
        }
        fs::rename(&path, &target)?;

        let new_id = self.id_for(&target);
        tracing::info!(from = id, to = %new_id, "Renamed document");
        Ok(new_id)
    }

    /// Whether `id` lies at or below `parent`; unknown ids are never children
    pub fn is_child(&self, parent: &str, id: &str) -> bool {
        match (self.path_for(parent), self.path_for(id)) {
            (Ok(parent), Ok(child)) => child.starts_with(parent),
            _ => false,
        }
    }

    /// A top-level entry named like the root id could never be addressed
    fn check_reserved(&self, parent: &Path, name: &str) -> Result<()> {
        if parent == self.root && name == ROOT_ID {
            return Err(ShellError::InvalidDocument(format!(
                "'{ROOT_ID}' is reserved at the top level"
            )));
        }
        Ok(())
    }

    /// Resolve an existing document id to a path inside the root
    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id == ROOT_ID {
            return Ok(self.root.clone());
        }
        if id.contains('\0') || id.contains('\\') {
            return Err(ShellError::InvalidDocument(id.to_string()));
        }
        let relative = Path::new(id);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ShellError::InvalidDocument(id.to_string()));
        }

        let path = self.root.join(relative);
        let canonical = path.canonicalize().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ShellError::DocumentNotFound(id.to_string()),
            _ => ShellError::Io(e),
        })?;
        if !canonical.starts_with(&self.root) {
            tracing::warn!(id, "Document id resolves outside the store");
            return Err(ShellError::InvalidDocument(id.to_string()));
        }
        Ok(canonical)
    }

    fn id_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            ROOT_ID.to_string()
        } else {
            parts.join("/")
        }
    }

    fn row_for(&self, path: &Path) -> Result<DocumentRow> {
        let metadata = fs::metadata(path)?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut flags = SUPPORTS_DELETE | SUPPORTS_RENAME;
        let mime_type = if metadata.is_dir() {
            flags |= DIR_SUPPORTS_CREATE;
            MIME_TYPE_DIR
        } else {
            if !metadata.permissions().readonly() {
                flags |= SUPPORTS_WRITE;
            }
            mime::mime_for_path(&display_name)
        };

        let last_modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or(0);

        Ok(DocumentRow {
            document_id: self.id_for(path),
            display_name,
            size: metadata.len(),
            mime_type: mime_type.to_string(),
            last_modified,
            flags,
        })
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ShellError::InvalidDocument(name.to_string()));
    }
    Ok(())
}
