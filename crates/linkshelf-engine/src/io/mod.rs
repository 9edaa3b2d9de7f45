use relative_path::RelativePath;
use std::fs;
use std::path::{Path, PathBuf};

use crate::editing::{ApplyError, EditOp, apply_batch};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("commit rejected: {0}")]
    Rejected(#[from] ApplyError),
}

/// Where documents live and how batches reach them.
///
/// `commit` is all-or-nothing: either every operation of the batch is
/// applied and the document persisted, or the document is untouched.
pub trait DocumentStore {
    fn fetch(&self, id: &RelativePath) -> Result<Vec<u8>, StoreError>;
    fn commit(&self, id: &RelativePath, ops: &[EditOp]) -> Result<(), StoreError>;
}

/// Flat markdown files under a root directory, addressed by relative path.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentStore for FileStore {
    fn fetch(&self, id: &RelativePath) -> Result<Vec<u8>, StoreError> {
        let path = id.to_path(&self.root);
        if !path.exists() {
            return Err(StoreError::NotFound(path));
        }
        Ok(fs::read(&path)?)
    }

    fn commit(&self, id: &RelativePath, ops: &[EditOp]) -> Result<(), StoreError> {
        let bytes = self.fetch(id)?;
        let text = std::str::from_utf8(&bytes)?;
        // The whole batch is applied in memory first; a single write makes
        // the commit effectively atomic from the document's perspective.
        let rewritten = apply_batch(text, ops)?;
        fs::write(id.to_path(&self.root), rewritten)?;
        Ok(())
    }
}
