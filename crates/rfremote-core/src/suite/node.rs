use std::path::{Path, PathBuf};

/// A node in a parsed suite tree.
///
/// Directories become container nodes; suite files become nodes carrying
/// their test count. A node may hold tests and children at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteNode {
    /// Display name, used to rebuild the hierarchy on the agent.
    pub name: String,
    /// File or directory the node was built from. `None` for a synthetic root.
    pub source: Option<PathBuf>,
    /// Number of test cases defined directly in this node's file.
    pub test_count: usize,
    pub children: Vec<SuiteNode>,
}

impl SuiteNode {
    /// Creates a container node for a directory or a synthetic root.
    pub fn container(name: impl Into<String>, source: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source,
            test_count: 0,
            children: Vec::new(),
        }
    }

    /// Creates a node for a suite file.
    pub fn file(name: impl Into<String>, source: impl Into<PathBuf>, test_count: usize) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
            test_count,
            children: Vec::new(),
        }
    }

    /// Adds a child and returns self, for building trees by hand.
    pub fn with_child(mut self, child: SuiteNode) -> Self {
        self.children.push(child);
        self
    }

    /// True when the node directly contains tests and can be shipped.
    pub fn has_tests(&self) -> bool {
        self.test_count > 0 && self.source.is_some()
    }

    /// Basename of the node's source file, extension included.
    pub fn file_name(&self) -> Option<&str> {
        self.source
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
    }

    /// Total number of test-bearing nodes in this subtree.
    pub fn leaf_suite_count(&self) -> usize {
        let own = usize::from(self.has_tests());
        own + self.children.iter().map(SuiteNode::leaf_suite_count).sum::<usize>()
    }

    /// Total number of tests in this subtree.
    pub fn total_tests(&self) -> usize {
        self.test_count + self.children.iter().map(SuiteNode::total_tests).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let tree = SuiteNode::container("root", Some(PathBuf::from("/root")))
            .with_child(SuiteNode::file("S", "/root/S.robot", 2))
            .with_child(
                SuiteNode::container("sub", Some(PathBuf::from("/root/sub")))
                    .with_child(SuiteNode::file("T", "/root/sub/T.robot", 1))
                    .with_child(SuiteNode::file("Empty", "/root/sub/Empty.robot", 0)),
            );

        assert_eq!(tree.leaf_suite_count(), 2);
        assert_eq!(tree.total_tests(), 3);
        assert!(!tree.has_tests());
        assert_eq!(tree.children[0].file_name(), Some("S.robot"));
    }
}
