//! Dependency resolution for suite documents.
//!
//! Walks a document's `Library` and `Resource` imports, collects every
//! transitively referenced file into a [`DependencyCache`] and rewrites each
//! import to the bare basename. On the agent all dependencies sit flat in the
//! workspace root, which is on the engine's search path, so the basename is
//! all that resolves there.

mod cache;
mod error;

pub use cache::{Dependency, DependencyCache};
pub use error::{DependencyResolutionWarning, ResolveError, UnresolvedReason};

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::storage::{lexical_normalize, FileStore};
use crate::suite::{
    expand_builtin_variables, import_basename, split_bom, DocumentKind, ImportReference, ImportType, Section,
    SuiteDocument,
};

/// Outcome of looking an import target up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Directory(PathBuf),
    Missing,
}

/// Resolves and rewrites the imports of suite documents.
///
/// The resolver holds no per-request state. The cache is passed into every
/// call, so one resolver can serve any number of requests.
pub struct DependencyResolver<S: FileStore> {
    store: S,
    config: ResolverConfig,
}

impl<S: FileStore> DependencyResolver<S> {
    /// Creates a resolver with the default allow-list and extensions.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    pub fn with_config(store: S, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Reads a test suite from disk and returns its rewritten text.
    pub fn resolve_suite_file(
        &self,
        path: &Path,
        cache: &mut DependencyCache,
    ) -> Result<String, ResolveError> {
        let text = self.store.read_text(path)?;
        let doc = SuiteDocument::new(path, DocumentKind::TestSuite, &text);
        self.resolve_document(&doc, cache)
    }

    /// Rewrites a document's imports and collects its dependencies.
    ///
    /// Lines other than imports are copied through untouched.
    pub fn resolve_document(
        &self,
        doc: &SuiteDocument,
        cache: &mut DependencyCache,
    ) -> Result<String, ResolveError> {
        let mut output = String::new();

        for (section, line) in doc.lines_with_sections() {
            let (bom, content) = split_bom(line);
            let import = if section.allows_imports() && Section::from_header(content).is_none() {
                ImportReference::parse(content)
            } else {
                None
            };

            match import {
                Some(import) => {
                    output.push_str(bom);
                    output.push_str(&self.resolve_import(&import, doc, cache)?);
                }
                None => output.push_str(line),
            }
        }

        Ok(output)
    }

    /// Resolves one import and returns the rewritten line.
    fn resolve_import(
        &self,
        import: &ImportReference,
        doc: &SuiteDocument,
        cache: &mut DependencyCache,
    ) -> Result<String, ResolveError> {
        let target = expand_builtin_variables(&import.target_path, doc.base_dir());
        let basename = import_basename(&target).to_string();
        let rewritten = import.render_with_target(&basename);

        if cache.contains(&basename) {
            debug!(dependency = %basename, "Already resolved");
            return Ok(rewritten);
        }

        if self.config.is_stdlib(target.trim()) {
            debug!(library = %basename, "Standard library, not shipped");
            return Ok(rewritten);
        }

        let path = match self.locate(&target, doc.base_dir(), import.import_type) {
            Location::File(path) => path,
            Location::Directory(path) => {
                warn!(
                    importer = %doc.source_path().display(),
                    target = %import.target_path,
                    path = %path.display(),
                    "Import points at a directory, only files can be shipped"
                );
                self.record_unresolved(cache, doc, import, UnresolvedReason::Directory);
                return Ok(rewritten);
            }
            Location::Missing => {
                warn!(
                    importer = %doc.source_path().display(),
                    target = %import.target_path,
                    "Failed to resolve import, it must be available on the agent"
                );
                self.record_unresolved(cache, doc, import, UnresolvedReason::NotFound);
                return Ok(rewritten);
            }
        };

        // A companion extension changes the name the file is shipped under
        let (basename, rewritten) = match path.file_name().and_then(|n| n.to_str()) {
            Some(found) if found != basename => {
                let line = import.render_with_target(found);
                if cache.contains(found) {
                    return Ok(line);
                }
                (found.to_string(), line)
            }
            _ => (basename, rewritten),
        };

        if import.import_type == ImportType::Library && self.config.is_installed_package(&path) {
            debug!(library = %basename, path = %path.display(), "Installed package, not shipped");
            return Ok(rewritten);
        }

        cache.mark_visited(&basename);

        match import.import_type {
            ImportType::Library => {
                let bytes = self.store.read_bytes(&path)?;
                cache.insert(basename, Dependency::Binary(bytes));
            }
            ImportType::Resource => {
                let text = self.store.read_text(&path)?;
                let resource = SuiteDocument::new(&path, DocumentKind::Resource, &text);
                let resolved = self.resolve_document(&resource, cache)?;
                cache.insert(basename, Dependency::Text(resolved));
            }
        }

        Ok(rewritten)
    }

    /// Finds the file an import target refers to.
    ///
    /// Relative targets are tried against the importing document's directory
    /// first, then against the configured search paths.
    fn locate(&self, target: &str, base_dir: &Path, import_type: ImportType) -> Location {
        let target_path = Path::new(target.trim());

        let candidates: Vec<PathBuf> = if target_path.is_absolute() {
            vec![lexical_normalize(target_path)]
        } else {
            std::iter::once(base_dir)
                .chain(self.config.search_paths.iter().map(PathBuf::as_path))
                .map(|dir| lexical_normalize(&dir.join(target_path)))
                .collect()
        };

        let needs_extension =
            import_type == ImportType::Resource && target_path.extension().is_none();

        let mut directory = None;
        for candidate in candidates {
            if self.store.is_file(&candidate) {
                return Location::File(candidate);
            }

            if needs_extension {
                for ext in &self.config.resource_extensions {
                    let mut with_ext = candidate.clone().into_os_string();
                    with_ext.push(ext);
                    let with_ext = PathBuf::from(with_ext);
                    if self.store.is_file(&with_ext) {
                        return Location::File(with_ext);
                    }
                }
            }

            if directory.is_none() && self.store.is_dir(&candidate) {
                directory = Some(candidate);
            }
        }

        match directory {
            Some(dir) => Location::Directory(dir),
            None => Location::Missing,
        }
    }

    fn record_unresolved(
        &self,
        cache: &mut DependencyCache,
        doc: &SuiteDocument,
        import: &ImportReference,
        reason: UnresolvedReason,
    ) {
        cache.record_warning(DependencyResolutionWarning {
            importer: doc.source_path().to_path_buf(),
            target: import.target_path.clone(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalFileStore;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_resource_extension_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let suite = write(
            root,
            "S.robot",
            "*** Settings ***\nResource    res/Common\n",
        );
        write(root, "res/Common.resource", "*** Keywords ***\nNoop\n    No Operation\n");

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let mut cache = DependencyCache::new();
        let text = resolver.resolve_suite_file(&suite, &mut cache).unwrap();

        assert_eq!(text, "*** Settings ***\nResource    Common.resource\n");
        assert!(cache.get("Common.resource").is_some());
    }

    #[test]
    fn test_search_paths_are_tried_after_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let suite = write(root, "suites/S.robot", "Library    Shared.py\n");
        write(root, "shared/Shared.py", "def shared(): pass\n");

        let config = ResolverConfig {
            search_paths: vec![root.join("shared")],
            ..ResolverConfig::default()
        };
        let resolver = DependencyResolver::with_config(LocalFileStore::new(), config);
        let mut cache = DependencyCache::new();
        resolver.resolve_suite_file(&suite, &mut cache).unwrap();

        assert_eq!(
            cache.get("Shared.py"),
            Some(&Dependency::Binary(b"def shared(): pass\n".to_vec()))
        );
    }

    #[test]
    fn test_directory_target_is_not_shipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let suite = write(root, "S.robot", "Library    mypackage/\n");
        fs::create_dir_all(root.join("mypackage")).unwrap();

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let mut cache = DependencyCache::new();
        let text = resolver.resolve_suite_file(&suite, &mut cache).unwrap();

        assert_eq!(text, "Library    mypackage\n");
        assert!(cache.is_empty());
        assert_eq!(cache.warnings()[0].reason, UnresolvedReason::Directory);
    }

    #[test]
    fn test_installed_library_is_not_shipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let suite = write(
            root,
            "S.robot",
            "Library    venv/lib/site-packages/Vendor.py\n",
        );
        write(root, "venv/lib/site-packages/Vendor.py", "x = 1\n");

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let mut cache = DependencyCache::new();
        let text = resolver.resolve_suite_file(&suite, &mut cache).unwrap();

        assert_eq!(text, "Library    Vendor.py\n");
        assert!(cache.is_empty());
        assert!(cache.warnings().is_empty());
    }

    #[test]
    fn test_imports_outside_settings_are_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let text = concat!(
            "*** Settings ***\n",
            "Library    lib/A.py\n",
            "*** Keywords ***\n",
            "Library    lib/B.py\n",
        );
        let suite = write(root, "S.robot", text);
        write(root, "lib/A.py", "a = 1\n");
        write(root, "lib/B.py", "b = 1\n");

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let mut cache = DependencyCache::new();
        let rewritten = resolver.resolve_suite_file(&suite, &mut cache).unwrap();

        assert!(rewritten.contains("Library    A.py\n"));
        assert!(rewritten.contains("Library    lib/B.py\n"));
        assert_eq!(cache.names().collect::<Vec<_>>(), vec!["A.py"]);
    }

    #[test]
    fn test_settings_header_with_column_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let text = concat!(
            "*** Settings ***    Value\n",
            "Library    lib/Helpers.py\n",
            "\n",
            "*** Test Cases ***    Action    Argument\n",
            "T\n",
            "    No Operation\n",
        );
        let suite = write(root, "S.robot", text);
        write(root, "lib/Helpers.py", "def helper(): pass\n");

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let mut cache = DependencyCache::new();
        let rewritten = resolver.resolve_suite_file(&suite, &mut cache).unwrap();

        assert_eq!(rewritten, text.replace("lib/Helpers.py", "Helpers.py"));
        assert_eq!(cache.names().collect::<Vec<_>>(), vec!["Helpers.py"]);
    }

    #[test]
    fn test_import_on_first_line_after_byte_order_mark() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let suite = write(
            root,
            "B.robot",
            "\u{feff}Library    lib/Helpers.py\n*** Test Cases ***\nT\n    No Operation\n",
        );
        write(root, "lib/Helpers.py", "def helper(): pass\n");

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let mut cache = DependencyCache::new();
        let rewritten = resolver.resolve_suite_file(&suite, &mut cache).unwrap();

        assert_eq!(
            rewritten,
            "\u{feff}Library    Helpers.py\n*** Test Cases ***\nT\n    No Operation\n"
        );
        assert!(cache.get("Helpers.py").is_some());
    }

    #[test]
    fn test_curdir_variable() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let suite = write(root, "S.robot", "Library    ${CURDIR}/lib/Helpers.py\n");
        write(root, "lib/Helpers.py", "def helper(): pass\n");

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let mut cache = DependencyCache::new();
        let text = resolver.resolve_suite_file(&suite, &mut cache).unwrap();

        assert_eq!(text, "Library    Helpers.py\n");
        assert!(cache.get("Helpers.py").is_some());
    }

    #[test]
    fn test_unreadable_resource_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let suite = write(root, "S.robot", "Resource    bad.robot\n");
        fs::write(root.join("bad.robot"), [0xff, 0xfe, 0xfd]).unwrap();

        let resolver = DependencyResolver::new(LocalFileStore::new());
        let mut cache = DependencyCache::new();
        let err = resolver.resolve_suite_file(&suite, &mut cache).unwrap_err();
        assert!(matches!(err, ResolveError::Read(_)));
    }
}
