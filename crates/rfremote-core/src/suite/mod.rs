//! Suite documents, their import settings and the suite tree.

mod discovery;
mod document;
mod import;
mod node;

pub use discovery::{DiscoveryError, DiscoveryOptions, FsSuiteDiscovery, SuiteDiscovery};
pub use document::{split_bom, split_lines, DocumentKind, Section, SuiteDocument};
pub use import::{
    expand_builtin_variables, import_basename, ImportReference, ImportType, CANONICAL_SEPARATOR,
};
pub use node::SuiteNode;
