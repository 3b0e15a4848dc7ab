use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::resolver::{
    Dependency, DependencyCache, DependencyResolutionWarning, DependencyResolver, ResolveError,
};
use crate::rpc::PackagedSuite;
use crate::storage::FileStore;
use crate::suite::SuiteNode;

/// Leaf suites and dependencies collected from one suite tree.
#[derive(Debug, Default)]
pub struct PackagedSuites {
    /// Leaf suites keyed by file name.
    pub suites: BTreeMap<String, PackagedSuite>,
    /// Dependencies shared by all suites, keyed by basename.
    pub dependencies: BTreeMap<String, Dependency>,
    /// Imports that were rewritten but not shipped.
    pub warnings: Vec<DependencyResolutionWarning>,
}

/// Packages the test-bearing nodes of a suite tree.
///
/// Container-only nodes correspond to directories and are not shipped;
/// their names survive in the relative paths of the suites below them.
pub struct SuiteHierarchyPackager<'r, S: FileStore> {
    resolver: &'r DependencyResolver<S>,
}

impl<'r, S: FileStore> SuiteHierarchyPackager<'r, S> {
    pub fn new(resolver: &'r DependencyResolver<S>) -> Self {
        Self { resolver }
    }

    /// Packages every leaf suite under `root` with one request-scoped cache.
    pub fn package(&self, root: &SuiteNode) -> Result<PackagedSuites, ResolveError> {
        let mut cache = DependencyCache::new();
        let mut suites = BTreeMap::new();
        let mut ancestors = Vec::new();

        self.visit(root, true, &mut ancestors, &mut cache, &mut suites)?;

        let warnings = cache.warnings().to_vec();
        Ok(PackagedSuites {
            suites,
            dependencies: cache.into_dependencies(),
            warnings,
        })
    }

    /// Depth-first walk. `ancestors` holds the names between the root
    /// (excluded) and the current node (excluded).
    fn visit(
        &self,
        node: &SuiteNode,
        is_root: bool,
        ancestors: &mut Vec<String>,
        cache: &mut DependencyCache,
        suites: &mut BTreeMap<String, PackagedSuite>,
    ) -> Result<(), ResolveError> {
        if let (true, Some(source), Some(file_name)) =
            (node.has_tests(), node.source.as_deref(), node.file_name())
        {
            debug!(suite = %node.name, "Processing test suite");

            let relative_path = ancestors.join("/");
            let suite_data = self.resolver.resolve_suite_file(source, cache)?;

            let packaged = PackagedSuite {
                relative_path,
                suite_data,
            };
            if let Some(previous) = suites.insert(file_name.to_string(), packaged) {
                warn!(
                    suite = %file_name,
                    replaced = %previous.relative_path,
                    "Two suites share a file name, only the last one is shipped"
                );
            }
        }

        if !is_root {
            ancestors.push(node.name.clone());
        }
        for child in &node.children {
            self.visit(child, false, ancestors, cache, suites)?;
        }
        if !is_root {
            ancestors.pop();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalFileStore;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const TESTS: &str = "*** Test Cases ***\nT\n    No Operation\n";

    fn write(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, TESTS).unwrap();
        path
    }

    #[test]
    fn test_leaf_suite_filter() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        // 3 directory-only nodes, 2 test-bearing nodes
        let tree = SuiteNode::container("root", Some(root.to_path_buf()))
            .with_child(
                SuiteNode::container("a", Some(root.join("a")))
                    .with_child(SuiteNode::file("One", write(root, "a/One.robot"), 1)),
            )
            .with_child(
                SuiteNode::container("b", Some(root.join("b")))
                    .with_child(SuiteNode::file("Two", write(root, "b/Two.robot"), 3)),
            );

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let packaged = SuiteHierarchyPackager::new(&resolver).package(&tree).unwrap();

        assert_eq!(packaged.suites.len(), 2);
        assert_eq!(packaged.suites["One.robot"].relative_path, "a");
        assert_eq!(packaged.suites["Two.robot"].relative_path, "b");
    }

    #[test]
    fn test_path_reconstruction() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let tree = SuiteNode::container("top", Some(root.to_path_buf())).with_child(
            SuiteNode::container("X", Some(root.join("X"))).with_child(
                SuiteNode::container("Y", Some(root.join("X/Y")))
                    .with_child(SuiteNode::file("Z", write(root, "X/Y/Z.robot"), 1)),
            ),
        );

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let packaged = SuiteHierarchyPackager::new(&resolver).package(&tree).unwrap();

        assert_eq!(packaged.suites["Z.robot"].relative_path, "X/Y");
    }

    #[test]
    fn test_root_suite_has_empty_path() {
        let temp_dir = TempDir::new().unwrap();
        let file = write(temp_dir.path(), "Only.robot");

        let tree = SuiteNode::file("Only", file, 1);
        let resolver = DependencyResolver::new(LocalFileStore::new());
        let packaged = SuiteHierarchyPackager::new(&resolver).package(&tree).unwrap();

        assert_eq!(packaged.suites["Only.robot"].relative_path, "");
        assert_eq!(packaged.suites["Only.robot"].suite_data, TESTS);
    }

    #[test]
    fn test_container_with_tests_and_children() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        // Uncommon, but a node may carry tests and children at once
        let mut parent = SuiteNode::file("P", write(root, "P.robot"), 1);
        parent.children.push(SuiteNode::file("C", write(root, "sub/C.robot"), 1));
        let tree = SuiteNode::container("root", Some(root.to_path_buf())).with_child(parent);

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let packaged = SuiteHierarchyPackager::new(&resolver).package(&tree).unwrap();

        assert_eq!(packaged.suites["P.robot"].relative_path, "");
        assert_eq!(packaged.suites["C.robot"].relative_path, "P");
    }
}
