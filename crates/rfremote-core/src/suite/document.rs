use std::path::{Path, PathBuf};

use super::import::separator;

/// Byte order mark some editors put at the start of a file.
const BOM: char = '\u{feff}';

/// Whether a document holds runnable tests or only reusable definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    TestSuite,
    Resource,
}

/// Section of a suite document, as named by its `*** ... ***` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Lines before the first header.
    Preamble,
    Settings,
    Variables,
    TestCases,
    Keywords,
    Comments,
    Other,
}

impl Section {
    /// Parses a header line such as `*** Settings ***`.
    ///
    /// Returns `None` when the line is not a section header. Column names
    /// after the header (`*** Test Cases ***    Action`) are ignored.
    pub fn from_header(line: &str) -> Option<Self> {
        let (_, content) = split_bom(line);
        let rest = content.strip_prefix('*')?;

        // The name ends at the closing asterisks or at the first column name
        let name = rest.trim_start_matches('*');
        let name = name.split('*').next().unwrap_or(name).trim();
        let name = match separator().find(name) {
            Some(sep) => &name[..sep.start()],
            None => name,
        };
        let name = name.to_lowercase();

        let section = match name.as_str() {
            "setting" | "settings" => Section::Settings,
            "variable" | "variables" => Section::Variables,
            "test case" | "test cases" | "task" | "tasks" => Section::TestCases,
            "keyword" | "keywords" => Section::Keywords,
            "comment" | "comments" => Section::Comments,
            _ => Section::Other,
        };
        Some(section)
    }

    /// Whether import settings are honoured in this section.
    pub fn allows_imports(self) -> bool {
        matches!(self, Section::Preamble | Section::Settings)
    }
}

/// A suite or resource file read from disk.
///
/// Lines keep their original line endings so the document can be
/// reassembled byte for byte.
#[derive(Debug, Clone)]
pub struct SuiteDocument {
    source_path: PathBuf,
    kind: DocumentKind,
    raw_lines: Vec<String>,
}

impl SuiteDocument {
    /// Creates a document from its full text.
    pub fn new(source_path: impl Into<PathBuf>, kind: DocumentKind, text: &str) -> Self {
        Self {
            source_path: source_path.into(),
            kind,
            raw_lines: split_lines(text),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn raw_lines(&self) -> &[String] {
        &self.raw_lines
    }

    /// Directory containing the document; relative imports resolve against it.
    pub fn base_dir(&self) -> &Path {
        self.source_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Iterates lines together with the section each one belongs to.
    pub fn lines_with_sections(&self) -> impl Iterator<Item = (Section, &str)> {
        let mut current = Section::Preamble;
        self.raw_lines.iter().map(move |line| {
            if let Some(section) = Section::from_header(line) {
                current = section;
            }
            (current, line.as_str())
        })
    }

    /// Counts the test cases (or tasks) the document defines.
    ///
    /// Every non-indented, non-comment line inside a test case section
    /// starts a new test.
    pub fn test_count(&self) -> usize {
        self.lines_with_sections()
            .filter(|(section, line)| {
                *section == Section::TestCases
                    && Section::from_header(line).is_none()
                    && starts_test_name(line)
            })
            .count()
    }
}

fn starts_test_name(line: &str) -> bool {
    let (_, line) = split_bom(line);
    match line.chars().next() {
        Some(c) if c.is_whitespace() => false,
        Some('#') | None => false,
        // Continuation rows belong to the previous test
        Some('.') => !line.starts_with("..."),
        Some(_) => true,
    }
}

/// Splits a leading byte order mark off a line, returning `(bom, rest)`.
///
/// The mark is ignored when lines are classified but kept in emitted text.
pub fn split_bom(line: &str) -> (&str, &str) {
    match line.strip_prefix(BOM) {
        Some(rest) => (&line[..BOM.len_utf8()], rest),
        None => ("", line),
    }
}

/// Splits text into lines, each keeping its terminating `\n` or `\r\n`.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}
