use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::error::DependencyResolutionWarning;
use crate::rpc::encoding::base64_bytes;

/// Content of one shipped dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Dependency {
    /// A resource document, already rewritten.
    Text(String),
    /// A library file, shipped untouched.
    Binary(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl Dependency {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Dependency::Text(text) => text.as_bytes(),
            Dependency::Binary(bytes) => bytes,
        }
    }
}

/// Dependencies collected for one execution request, keyed by basename.
///
/// A basename is marked visited before its file is read. Once marked it is
/// never resolved again, which also breaks resource cycles.
#[derive(Debug, Default)]
pub struct DependencyCache {
    entries: BTreeMap<String, Dependency>,
    visited: HashSet<String>,
    warnings: Vec<DependencyResolutionWarning>,
}

impl DependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `name` has been visited, whether or not it finished resolving.
    pub fn contains(&self, name: &str) -> bool {
        self.visited.contains(name) || self.entries.contains_key(name)
    }

    /// Marks `name` as visited. Returns false if it already was.
    pub fn mark_visited(&mut self, name: &str) -> bool {
        self.visited.insert(name.to_string())
    }

    pub fn insert(&mut self, name: impl Into<String>, dependency: Dependency) {
        let name = name.into();
        self.visited.insert(name.clone());
        self.entries.insert(name, dependency);
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn record_warning(&mut self, warning: DependencyResolutionWarning) {
        self.warnings.push(warning);
    }

    /// Imports that were rewritten but could not be shipped.
    pub fn warnings(&self) -> &[DependencyResolutionWarning] {
        &self.warnings
    }

    /// Consumes the cache, returning the dependency map to ship.
    pub fn into_dependencies(self) -> BTreeMap<String, Dependency> {
        self.entries
    }
}
