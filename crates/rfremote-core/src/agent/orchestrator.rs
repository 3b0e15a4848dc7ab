//! Runs one execution request end to end on the agent.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::engine::{EngineError, EngineInvocation, EngineIsolation, EngineOutput, ExecutionEngine};
use super::scoped::{lock_process_state, SearchPathGuard, WorkingDirGuard};
use super::workspace::{top_level_entries, Workspace, WorkspaceError, WorkspaceManager};
use crate::config::{DEFAULT_SEARCH_PATH_VAR, LOG_HTML, OUTPUT_XML, REPORT_HTML};
use crate::rpc::{ExecutionRequest, ExecutionResponse};

/// Stages a run passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    WorkspaceCreated,
    SearchPathExtended,
    Executing,
    ArtifactsHarvested,
    CleanedUp,
    Preserved,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::WorkspaceCreated => "workspace_created",
            RunStage::SearchPathExtended => "search_path_extended",
            RunStage::Executing => "executing",
            RunStage::ArtifactsHarvested => "artifacts_harvested",
            RunStage::CleanedUp => "cleaned_up",
            RunStage::Preserved => "preserved",
        };
        f.write_str(name)
    }
}

/// Errors that end a request. The agent itself keeps running.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Failed to prepare workspace: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Failed to scope process state: {0}")]
    ProcessState(#[source] io::Error),

    #[error("Execution engine fault: {source}")]
    Engine {
        #[source]
        source: EngineError,
        /// Output and artifacts harvested after the fault.
        partial: Box<ExecutionResponse>,
    },
}

impl OrchestratorError {
    /// Short message for the RPC caller. Details stay in the agent log.
    pub fn fault_message(&self) -> String {
        match self {
            OrchestratorError::Workspace(_) | OrchestratorError::ProcessState(_) => {
                "Failed to prepare workspace on agent".to_string()
            }
            OrchestratorError::Engine { .. } => "Execution engine fault on agent".to_string(),
        }
    }
}

/// Materializes a request, runs the engine and collects the artifacts.
pub struct ExecutionOrchestrator<E: ExecutionEngine> {
    workspaces: WorkspaceManager,
    engine: E,
    search_path_var: String,
}

impl<E: ExecutionEngine> ExecutionOrchestrator<E> {
    pub fn new(workspaces: WorkspaceManager, engine: E) -> Self {
        Self {
            workspaces,
            engine,
            search_path_var: DEFAULT_SEARCH_PATH_VAR.to_string(),
        }
    }

    /// Sets the variable extended for [`EngineIsolation::ProcessGlobal`] engines.
    pub fn with_search_path_var(mut self, var: impl Into<String>) -> Self {
        self.search_path_var = var.into();
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs a request. The workspace is removed afterwards on every path,
    /// unless the request asks for debug mode.
    pub fn execute_robot_run(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, OrchestratorError> {
        let mut stage = RunStage::Idle;

        let mut workspace = self
            .workspaces
            .create_workspace(&request.suites, &request.dependencies)
            .inspect_err(|e| error!(error = %e, "Failed to create workspace"))?;
        if request.debug {
            workspace.preserve();
        }
        self.advance(&mut stage, RunStage::WorkspaceCreated, &workspace);

        let suites = top_level_entries(&request.suites);
        let invocation = EngineInvocation {
            workspace: workspace.path(),
            suites: &suites,
            options: &request.run_options,
        };

        let run = match self.engine.isolation() {
            EngineIsolation::RequestLocal => {
                // Workspace reaches the engine as explicit arguments
                self.advance(&mut stage, RunStage::SearchPathExtended, &workspace);
                self.advance(&mut stage, RunStage::Executing, &workspace);
                self.engine.run(&invocation)
            }
            EngineIsolation::ProcessGlobal => self.run_scoped(&invocation, &mut stage, &workspace)?,
        };

        let (output_xml, log_html, report_html) = harvest_artifacts(workspace.path());
        self.advance(&mut stage, RunStage::ArtifactsHarvested, &workspace);

        let final_stage = if workspace.is_preserved() {
            RunStage::Preserved
        } else {
            RunStage::CleanedUp
        };
        let workspace_path = workspace.path().to_path_buf();
        drop(workspace);
        debug!(workspace = %workspace_path.display(), from = %stage, to = %final_stage, "Run stage");

        match run {
            Ok(EngineOutput {
                combined_output,
                return_code,
            }) => {
                info!(return_code, "Run finished");
                Ok(ExecutionResponse {
                    combined_output,
                    output_xml,
                    log_html,
                    report_html,
                    return_code,
                })
            }
            Err(source) => {
                error!(
                    workspace = %workspace_path.display(),
                    error = %source,
                    output = %String::from_utf8_lossy(source.partial_output()),
                    "Execution engine fault"
                );
                let partial = ExecutionResponse {
                    combined_output: source.partial_output().to_vec(),
                    output_xml,
                    log_html,
                    report_html,
                    return_code: -1,
                };
                Err(OrchestratorError::Engine {
                    source,
                    partial: Box::new(partial),
                })
            }
        }
    }

    /// Runs the engine with the working directory and search path pointed at
    /// the workspace, serialized against every other scoped run.
    fn run_scoped(
        &self,
        invocation: &EngineInvocation<'_>,
        stage: &mut RunStage,
        workspace: &Workspace,
    ) -> Result<Result<EngineOutput, EngineError>, OrchestratorError> {
        let _lock = lock_process_state();

        let _search_path = SearchPathGuard::prepend(&self.search_path_var, workspace.path())
            .map_err(OrchestratorError::ProcessState)?;
        self.advance(stage, RunStage::SearchPathExtended, workspace);

        let _cwd =
            WorkingDirGuard::change_to(workspace.path()).map_err(OrchestratorError::ProcessState)?;
        self.advance(stage, RunStage::Executing, workspace);

        Ok(self.engine.run(invocation))
    }

    fn advance(&self, stage: &mut RunStage, next: RunStage, workspace: &Workspace) {
        debug!(workspace = %workspace.path().display(), from = %stage, to = %next, "Run stage");
        *stage = next;
    }
}

/// Reads the three artifacts from the workspace root. Missing files are empty.
fn harvest_artifacts(dir: &Path) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let read = |name: &str| match fs::read(dir.join(name)) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(artifact = name, "Artifact not produced");
            Vec::new()
        }
        Err(e) => {
            warn!(artifact = name, error = %e, "Failed to read artifact");
            Vec::new()
        }
    };

    (read(OUTPUT_XML), read(LOG_HTML), read(REPORT_HTML))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::PackagedSuite;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes artifacts and records what it saw in the workspace.
    #[derive(Default)]
    struct RecordingEngine {
        seen: Mutex<Vec<String>>,
    }

    impl ExecutionEngine for RecordingEngine {
        fn run(&self, invocation: &EngineInvocation<'_>) -> Result<EngineOutput, EngineError> {
            self.seen
                .lock()
                .unwrap()
                .extend(invocation.suites.iter().cloned());
            fs::write(invocation.workspace.join(OUTPUT_XML), "<robot/>").unwrap();
            fs::write(invocation.workspace.join(LOG_HTML), "log").unwrap();
            Ok(EngineOutput {
                combined_output: b"1 test, 1 passed".to_vec(),
                return_code: 0,
            })
        }
    }

    fn request(debug: bool) -> ExecutionRequest {
        let mut request = ExecutionRequest {
            debug,
            ..Default::default()
        };
        request.suites.insert(
            "S.robot".to_string(),
            PackagedSuite {
                relative_path: "sub".to_string(),
                suite_data: "*** Test Cases ***\nT\n    No Operation\n".to_string(),
            },
        );
        request
    }

    #[test]
    fn test_successful_run() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator =
            ExecutionOrchestrator::new(WorkspaceManager::new(temp_dir.path()), RecordingEngine::default());

        let response = orchestrator.execute_robot_run(&request(false)).unwrap();

        assert_eq!(response.return_code, 0);
        assert_eq!(response.output_xml, b"<robot/>");
        assert_eq!(response.log_html, b"log");
        assert!(response.report_html.is_empty());
        assert_eq!(response.combined_output_lossy(), "1 test, 1 passed");
        assert_eq!(*orchestrator.engine().seen.lock().unwrap(), vec!["sub"]);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RunStage::SearchPathExtended.to_string(), "search_path_extended");
        assert_eq!(RunStage::Preserved.to_string(), "preserved");
    }
}
