//! Builds the suite tree handed to the packager from paths on disk.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::document::{DocumentKind, SuiteDocument};
use super::node::SuiteNode;
use crate::config::DEFAULT_SUITE_EXTENSIONS;

/// Errors that can occur while discovering suites.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Suite path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Invalid suite pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Turns user-supplied suite paths into a parsed suite tree.
pub trait SuiteDiscovery {
    fn discover(&self, paths: &[PathBuf]) -> Result<SuiteNode, DiscoveryError>;
}

/// Filters applied while discovering suites.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Accepted suite file extensions, without leading dots.
    pub extensions: Vec<String>,
    /// Suite name patterns (`*` and `?` wildcards). Empty selects everything.
    pub include_suites: Vec<String>,
}

impl DiscoveryOptions {
    /// Builds options from a colon-separated extension list such as `robot:txt`.
    pub fn new(extensions: Option<&str>, include_suites: Vec<String>) -> Self {
        let extensions = extensions
            .map(|e| e.split(':').map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            extensions,
            include_suites,
        }
    }
}

/// Discovers suites on the local file system.
///
/// One input path becomes the tree root. Several paths are grouped under a
/// synthetic root without a source.
#[derive(Debug)]
pub struct FsSuiteDiscovery {
    extensions: Vec<String>,
    include_patterns: Vec<Regex>,
}

impl FsSuiteDiscovery {
    pub fn new(options: DiscoveryOptions) -> Result<Self, DiscoveryError> {
        let mut extensions: Vec<String> = options
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if extensions.is_empty() {
            extensions = DEFAULT_SUITE_EXTENSIONS.iter().map(|s| s.to_string()).collect();
        }

        let include_patterns = options
            .include_suites
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            extensions,
            include_patterns,
        })
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn selected(&self, name: &str, long_name: &str) -> bool {
        if self.include_patterns.is_empty() {
            return true;
        }

        // A pattern may name the suite itself or any dotted tail of its long name
        let mut candidates = vec![name.to_string()];
        let parts: Vec<&str> = long_name.split('.').collect();
        for start in 0..parts.len() {
            candidates.push(parts[start..].join("."));
        }

        self.include_patterns
            .iter()
            .any(|re| candidates.iter().any(|c| re.is_match(c)))
    }

    fn build_node(
        &self,
        path: &Path,
        parent_long_name: Option<&str>,
        parent_selected: bool,
        explicit: bool,
    ) -> Result<Option<SuiteNode>, DiscoveryError> {
        let name = suite_name(path);
        let long_name = match parent_long_name {
            Some(parent) => format!("{}.{}", parent, name),
            None => name.clone(),
        };
        let selected = parent_selected || self.selected(&name, &long_name);

        if path.is_dir() {
            let mut node = SuiteNode::container(name, Some(path.to_path_buf()));
            for child in self.list_children(path)? {
                if let Some(child_node) = self.build_node(&child, Some(&long_name), selected, false)? {
                    node.children.push(child_node);
                }
            }

            if node.children.is_empty() && !explicit {
                return Ok(None);
            }
            return Ok(Some(node));
        }

        if !selected || (!explicit && !self.accepts_extension(path)) {
            return Ok(None);
        }

        let text = fs::read_to_string(path).map_err(|e| DiscoveryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let test_count = SuiteDocument::new(path, DocumentKind::TestSuite, &text).test_count();

        // Files without tests inside a directory are resources, not suites
        if test_count == 0 && !explicit {
            debug!(path = %path.display(), "Skipping file without test cases");
            return Ok(None);
        }

        Ok(Some(SuiteNode::file(name, path, test_count)))
    }

    /// Lists a directory's suite candidates in name order.
    fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .hidden(true)
            .max_depth(Some(1))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut children = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| DiscoveryError::Walk {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;

            if entry.depth() == 0 {
                continue;
            }

            let ignored = entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with('_') || n.starts_with('.'))
                .unwrap_or(true);
            if !ignored {
                children.push(entry.into_path());
            }
        }

        Ok(children)
    }
}

impl SuiteDiscovery for FsSuiteDiscovery {
    fn discover(&self, paths: &[PathBuf]) -> Result<SuiteNode, DiscoveryError> {
        for path in paths {
            if !path.exists() {
                return Err(DiscoveryError::NotFound(path.clone()));
            }
        }

        let root = if let [single] = paths {
            self.build_node(single, None, false, true)?
                .unwrap_or_else(|| SuiteNode::container(suite_name(single), Some(single.clone())))
        } else {
            let names: Vec<String> = paths.iter().map(|p| suite_name(p)).collect();
            let mut root = SuiteNode::container(names.join(" & "), None);
            for path in paths {
                if let Some(node) = self.build_node(path, None, false, true)? {
                    root.children.push(node);
                }
            }
            root
        };

        debug!(
            root = %root.name,
            leaf_suites = root.leaf_suite_count(),
            tests = root.total_tests(),
            "Discovered suites"
        );

        Ok(root)
    }
}

/// File stem for files, directory name for directories.
fn suite_name(path: &Path) -> String {
    let name = if path.is_dir() {
        path.file_name()
    } else {
        path.file_stem()
    };
    name.map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Compiles a `*`/`?` wildcard pattern into a case-insensitive regex.
fn compile_pattern(pattern: &str) -> Result<Regex, DiscoveryError> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("(?i)^{}$", escaped)).map_err(|e| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}
