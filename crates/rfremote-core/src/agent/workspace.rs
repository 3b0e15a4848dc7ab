//! Per-request workspaces on the agent.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AgentConfig, WORKSPACE_PREFIX};
use crate::resolver::Dependency;
use crate::rpc::PackagedSuite;
use crate::storage::{FileStore, LocalFileStore, StoreError};

/// Errors that can occur while materializing a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write workspace file: {0}")]
    Store(#[from] StoreError),

    #[error("Unsafe entry name in request: '{0}'")]
    UnsafeName(String),
}

impl WorkspaceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkspaceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Creates uniquely named workspaces under a root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    store: LocalFileStore,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            store: LocalFileStore::new(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.workspace_root_or_default())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes suites into their relative directories and dependencies flat
    /// into a fresh workspace.
    ///
    /// Whatever was created is removed again when a write fails.
    pub fn create_workspace(
        &self,
        suites: &BTreeMap<String, PackagedSuite>,
        dependencies: &BTreeMap<String, Dependency>,
    ) -> Result<Workspace, WorkspaceError> {
        for (file_name, suite) in suites {
            validate_file_name(file_name)?;
            validate_relative_dir(&suite.relative_path)?;
        }
        for name in dependencies.keys() {
            validate_file_name(name)?;
        }

        self.store.create_dir_all(&self.root)?;

        let path = self.root.join(format!("{}{}", WORKSPACE_PREFIX, Uuid::new_v4()));
        // create_dir fails on an existing directory, so the name is ours alone
        fs::create_dir(&path).map_err(|e| WorkspaceError::io(&path, e))?;
        let workspace = Workspace {
            path,
            preserved: false,
        };

        for (file_name, suite) in suites {
            let dir = workspace.path.join(&suite.relative_path);
            self.store.create_dir_all(&dir)?;
            self.store
                .write_bytes(&dir.join(file_name), suite.suite_data.as_bytes())?;
        }

        for (name, dependency) in dependencies {
            self.store
                .write_bytes(&workspace.path.join(name), dependency.as_bytes())?;
        }

        debug!(
            workspace = %workspace.path.display(),
            suites = suites.len(),
            dependencies = dependencies.len(),
            "Workspace created"
        );

        Ok(workspace)
    }
}

/// A materialized workspace directory.
///
/// The directory is removed when the value is dropped unless
/// [`Workspace::preserve`] was called.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    preserved: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keeps the directory on disk after drop, for post-mortem inspection.
    pub fn preserve(&mut self) {
        self.preserved = true;
    }

    pub fn is_preserved(&self) -> bool {
        self.preserved
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.preserved {
            info!(workspace = %self.path.display(), "Workspace preserved");
            return;
        }

        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(workspace = %self.path.display(), error = %e, "Failed to remove workspace");
        }
    }
}

/// Entries the engine is pointed at: root-level suite files and the first
/// directory of every nested suite.
pub fn top_level_entries(suites: &BTreeMap<String, PackagedSuite>) -> Vec<String> {
    let entries: BTreeSet<String> = suites
        .iter()
        .map(|(file_name, suite)| {
            suite
                .relative_path
                .split('/')
                .find(|s| !s.is_empty())
                .unwrap_or(file_name)
                .to_string()
        })
        .collect();
    entries.into_iter().collect()
}

fn validate_file_name(name: &str) -> Result<(), WorkspaceError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(WorkspaceError::UnsafeName(name.to_string()));
    }
    Ok(())
}

fn validate_relative_dir(relative: &str) -> Result<(), WorkspaceError> {
    let path = Path::new(relative);
    let escapes = relative.contains(['\\', '\0'])
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(WorkspaceError::UnsafeName(relative.to_string()));
    }
    Ok(())
}
