//! Client-side persistence of the artifacts returned by a run.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::{DEFAULT_LOCAL_LOG_HTML, DEFAULT_LOCAL_OUTPUT_XML, DEFAULT_LOCAL_REPORT_HTML};
use crate::rpc::ExecutionResponse;
use crate::storage::{normalize_path, FileStore, StoreError};

/// Errors that can occur while saving artifacts locally.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Cannot resolve output path {path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact: {0}")]
    Write(#[from] StoreError),
}

/// The three artifacts an engine run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    OutputXml,
    LogHtml,
    ReportHtml,
}

impl ArtifactKind {
    fn default_file_name(self) -> &'static str {
        match self {
            ArtifactKind::OutputXml => DEFAULT_LOCAL_OUTPUT_XML,
            ArtifactKind::LogHtml => DEFAULT_LOCAL_LOG_HTML,
            ArtifactKind::ReportHtml => DEFAULT_LOCAL_REPORT_HTML,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::OutputXml => write!(f, "Output"),
            ArtifactKind::LogHtml => write!(f, "Log"),
            ArtifactKind::ReportHtml => write!(f, "Report"),
        }
    }
}

/// Where artifacts go on the local machine.
///
/// An explicit path is used as is when absolute and joined to the output
/// directory otherwise. Without one the `remote_*` default name is used.
#[derive(Debug, Clone, Default)]
pub struct OutputLocations {
    pub output_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

impl OutputLocations {
    /// The output directory, `.` when none was given.
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(Path::new("."))
    }

    /// Absolute local path for one artifact.
    pub fn path_for(&self, kind: ArtifactKind) -> Result<PathBuf, ArtifactError> {
        let explicit = match kind {
            ArtifactKind::OutputXml => self.output.as_deref(),
            ArtifactKind::LogHtml => self.log.as_deref(),
            ArtifactKind::ReportHtml => self.report.as_deref(),
        };

        let path = match explicit {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => self.output_dir().join(p),
            None => self.output_dir().join(kind.default_file_name()),
        };

        normalize_path(&path).map_err(|source| ArtifactError::Path { path, source })
    }
}

/// An artifact saved to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Writes the non-empty artifacts of a response.
pub struct ArtifactWriter<S: FileStore> {
    store: S,
    locations: OutputLocations,
}

impl<S: FileStore> ArtifactWriter<S> {
    pub fn new(store: S, locations: OutputLocations) -> Self {
        Self { store, locations }
    }

    /// Creates the output directory and writes every non-empty artifact.
    ///
    /// The first failure aborts the write.
    pub fn write(&self, response: &ExecutionResponse) -> Result<Vec<WrittenArtifact>, ArtifactError> {
        self.store.create_dir_all(self.locations.output_dir())?;

        let artifacts = [
            (ArtifactKind::OutputXml, &response.output_xml),
            (ArtifactKind::LogHtml, &response.log_html),
            (ArtifactKind::ReportHtml, &response.report_html),
        ];

        let mut written = Vec::new();
        for (kind, data) in artifacts {
            if data.is_empty() {
                debug!(artifact = %kind, "Artifact not produced, skipping");
                continue;
            }

            let path = self.locations.path_for(kind)?;
            self.store.write_bytes(&path, data)?;
            written.push(WrittenArtifact { kind, path });
        }

        Ok(written)
    }
}
