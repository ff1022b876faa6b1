//! Blob storage for uploaded record files.
//!
//! Objects are write-once and keyed by `records/{owner}/{uuid}.{ext}`. An
//! upload yields a retrieval URL that the record document keeps in `fileUrl`.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Extension used when the source file has none.
pub const FALLBACK_EXTENSION: &str = "dat";

/// Blob store errors.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),
}

pub type BlobResult<T> = Result<T, BlobError>;

/// Write-once object storage.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path` and return a URL that resolves to them.
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> BlobResult<String>;
}

/// Generate a fresh object path under the owner's namespace.
pub fn object_path(owner_id: &str, extension: &str) -> String {
    let ext = if extension.is_empty() {
        FALLBACK_EXTENSION
    } else {
        extension
    };
    format!("records/{}/{}.{}", owner_id, uuid::Uuid::new_v4(), ext)
}

/// Extension of a file name, lowercased; empty when there is none.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Content type for a file extension.
pub fn mime_type_for(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Blob store writing objects below a root directory.
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> BlobResult<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !safe {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for DirBlobStore {
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> BlobResult<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(BlobError::AlreadyExists(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes)?;
        debug!(path, content_type, size = bytes.len(), "blob stored");
        Ok(format!("file://{}", target.display()))
    }
}
