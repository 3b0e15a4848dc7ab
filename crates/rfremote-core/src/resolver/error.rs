use std::path::PathBuf;
use thiserror::Error;

use crate::storage::StoreError;

/// Fatal errors raised while resolving dependencies.
///
/// A missing import target is not an error; see [`DependencyResolutionWarning`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to read dependency: {0}")]
    Read(#[from] StoreError),
}

/// Why an import could not be shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// No file matched the target.
    NotFound,
    /// The target is a directory; only files can be shipped.
    Directory,
}

/// An import whose target could not be shipped. The line is still rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyResolutionWarning {
    /// Document containing the import.
    pub importer: PathBuf,
    /// Target as written in the import.
    pub target: String,
    pub reason: UnresolvedReason,
}
