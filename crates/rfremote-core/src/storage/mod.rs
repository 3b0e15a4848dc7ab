mod error;
mod file;

pub use error::StoreError;
pub use file::LocalFileStore;

use std::path::{Component, Path, PathBuf};

/// Trait for the byte-level file access used during dependency resolution.
///
/// Implementations read the suite documents, resources and libraries that
/// get packaged into a run. Every disk access of the resolver goes through
/// this trait.
pub trait FileStore {
    /// Reads a file's raw bytes.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError>;

    /// Writes raw bytes to a file, replacing it if present.
    fn write_bytes(&self, path: &Path, data: &[u8]) -> Result<(), StoreError>;

    /// Creates a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError>;

    /// Returns true if the path points at a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Returns true if the path points at a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Reads a file as UTF-8 text.
    fn read_text(&self, path: &Path) -> Result<String, StoreError> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|e| StoreError::Encoding {
            path: path.to_path_buf(),
            source: e.utf8_error(),
        })
    }
}

impl<T: FileStore + ?Sized> FileStore for &T {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        (**self).read_bytes(path)
    }

    fn write_bytes(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        (**self).write_bytes(path, data)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        (**self).create_dir_all(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }
}

/// Removes `.` and `..` components without touching the file system.
///
/// Leading `..` components of a relative path are kept.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Makes `path` absolute against the working directory and normalizes it
/// lexically.
pub fn normalize_path(path: &Path) -> std::io::Result<PathBuf> {
    Ok(lexical_normalize(&std::path::absolute(path)?))
}
