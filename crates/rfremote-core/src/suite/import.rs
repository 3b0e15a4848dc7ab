//! Recognition and rewriting of `Library` / `Resource` import settings.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Separator emitted between the fields of a rewritten import line.
pub const CANONICAL_SEPARATOR: &str = "    ";

/// Two or more whitespace characters, or a tab, separate fields.
pub(crate) fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\s{2,}|\t").expect("separator pattern is valid"))
}

/// Kind of dependency an import line pulls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportType {
    /// An executable module, shipped as raw bytes.
    Library,
    /// A suite document with reusable definitions, parsed recursively.
    Resource,
}

impl ImportType {
    fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("library") {
            Some(ImportType::Library)
        } else if keyword.eq_ignore_ascii_case("resource") {
            Some(ImportType::Resource)
        } else {
            None
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportType::Library => write!(f, "Library"),
            ImportType::Resource => write!(f, "Resource"),
        }
    }
}

/// An import setting parsed from one document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    pub import_type: ImportType,
    /// The keyword exactly as written (`Library`, `LIBRARY`, ...).
    pub keyword: String,
    /// Target as written: relative or absolute path, or a bare module name.
    pub target_path: String,
    /// Everything after the target, kept verbatim.
    pub trailing_arguments: Option<String>,
    /// `\n`, `\r\n`, or empty for a final unterminated line.
    pub line_ending: String,
}

impl ImportReference {
    /// Parses a line, returning `None` unless it has the import shape
    /// `<Library|Resource><separator><path>[<separator><args>]`.
    pub fn parse(line: &str) -> Option<Self> {
        let content = line.trim_end_matches(['\r', '\n']);
        let line_ending = &line[content.len()..];

        let first_sep = separator().find(content)?;
        let keyword = &content[..first_sep.start()];
        let import_type = ImportType::from_keyword(keyword)?;

        let rest = content[first_sep.end()..].trim_end();
        if rest.is_empty() {
            return None;
        }

        let (target_path, trailing_arguments) = match separator().find(rest) {
            Some(sep) => {
                let args = rest[sep.end()..].to_string();
                (&rest[..sep.start()], (!args.is_empty()).then_some(args))
            }
            None => (rest, None),
        };

        Some(Self {
            import_type,
            keyword: keyword.to_string(),
            target_path: target_path.to_string(),
            trailing_arguments,
            line_ending: line_ending.to_string(),
        })
    }

    /// Renders the line with the target replaced by `target`.
    pub fn render_with_target(&self, target: &str) -> String {
        let mut line = format!("{}{}{}", self.keyword, CANONICAL_SEPARATOR, target);
        if let Some(args) = &self.trailing_arguments {
            line.push_str(CANONICAL_SEPARATOR);
            line.push_str(args);
        }
        line.push_str(&self.line_ending);
        line
    }
}

/// Expands the built-in path variables `${CURDIR}` and `${/}`.
pub fn expand_builtin_variables(path: &str, curdir: &Path) -> String {
    path.replace("${CURDIR}", &curdir.to_string_lossy())
        .replace("${/}", std::path::MAIN_SEPARATOR_STR)
}

/// Final component of an import target, accepting either separator style.
pub fn import_basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
}
