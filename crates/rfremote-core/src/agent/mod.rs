//! Agent side of a remote run.

mod engine;
mod orchestrator;
mod scoped;
mod workspace;

pub use engine::{
    EngineError, EngineInvocation, EngineIsolation, EngineOutput, ExecutionEngine,
    RobotProcessEngine,
};
pub use orchestrator::{ExecutionOrchestrator, OrchestratorError, RunStage};
pub use scoped::{lock_process_state, SearchPathGuard, WorkingDirGuard};
pub use workspace::{top_level_entries, Workspace, WorkspaceError, WorkspaceManager};
