use std::fs;
use std::path::Path;

use super::error::StoreError;
use super::FileStore;

/// File store backed by the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl FileStore for LocalFileStore {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        fs::read(path).map_err(|e| StoreError::io(path, e))
    }

    fn write_bytes(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        // Ensure the parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        fs::write(path, data).map_err(|e| StoreError::io(path, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
