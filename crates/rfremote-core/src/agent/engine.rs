//! The test engine the agent delegates execution to.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::rpc::RunOptions;

/// Options the agent controls itself. Forwarding them would move artifacts
/// out of the workspace or change the search path.
const RESERVED_OPTIONS: &[&str] = &["outputdir", "output", "log", "report", "pythonpath"];

/// Errors raised by an execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine command is empty")]
    EmptyCommand,

    #[error("Failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to collect output of '{command}': {source}")]
    Output {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine terminated without an exit code")]
    Terminated { output: Vec<u8> },

    #[error("Engine failed: {0}")]
    Failed(String),
}

impl EngineError {
    /// Output captured before the failure, if any.
    pub fn partial_output(&self) -> &[u8] {
        match self {
            EngineError::Terminated { output } => output,
            _ => &[],
        }
    }
}

/// How an engine interacts with process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineIsolation {
    /// Working directory and search path are passed explicitly per run.
    RequestLocal,
    /// The engine reads the process working directory and search path
    /// variable, so runs must be serialized and the state scoped.
    ProcessGlobal,
}

/// One engine run.
#[derive(Debug, Clone, Copy)]
pub struct EngineInvocation<'a> {
    pub workspace: &'a Path,
    /// Suite entries relative to the workspace.
    pub suites: &'a [String],
    pub options: &'a RunOptions,
}

/// Result of an engine run that completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Standard output and standard error, interleaved as written.
    pub combined_output: Vec<u8>,
    pub return_code: i32,
}

/// Runs suites from a workspace and writes `output.xml`, `log.html` and
/// `report.html` into it.
pub trait ExecutionEngine: Send + Sync {
    fn isolation(&self) -> EngineIsolation {
        EngineIsolation::RequestLocal
    }

    fn run(&self, invocation: &EngineInvocation<'_>) -> Result<EngineOutput, EngineError>;
}

/// Runs the engine as a child process.
#[derive(Debug, Clone)]
pub struct RobotProcessEngine {
    program: String,
    base_args: Vec<String>,
}

impl RobotProcessEngine {
    /// Creates an engine from a command line such as `robot` or
    /// `python -m robot`.
    pub fn new(command: &str) -> Result<Self, EngineError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(EngineError::EmptyCommand)?;
        Ok(Self {
            program,
            base_args: parts.collect(),
        })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self, EngineError> {
        Self::new(&config.robot_command)
    }

    /// Checks the engine can be launched and returns its version line.
    pub fn probe(&self) -> Result<String, EngineError> {
        let output = self.command().arg("--version").output().map_err(|e| self.spawn_error(e))?;

        // robot --version exits with 251 after printing the version
        let text = String::from_utf8_lossy(&output.stdout);
        let version = text.lines().find(|l| !l.trim().is_empty()).map(str::trim);
        match version {
            Some(version) => Ok(version.to_string()),
            None => Err(EngineError::Failed(format!(
                "'{} --version' printed nothing",
                self.program
            ))),
        }
    }

    /// Command-line arguments for one run, suites last.
    pub fn build_args(&self, invocation: &EngineInvocation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.base_args.iter().map(OsString::from).collect();

        args.push("--outputdir".into());
        args.push(invocation.workspace.into());
        args.push("--pythonpath".into());
        args.push(invocation.workspace.into());

        for (name, value) in invocation.options.iter() {
            let flag = name.trim_start_matches('-').to_lowercase();
            if RESERVED_OPTIONS.contains(&flag.as_str()) {
                warn!(option = %name, "Ignoring run option controlled by the agent");
                continue;
            }

            for v in value.values() {
                if v.eq_ignore_ascii_case("true") {
                    args.push(format!("--{}", flag).into());
                } else if !v.eq_ignore_ascii_case("false") {
                    args.push(format!("--{}", flag).into());
                    args.push(v.into());
                }
            }
        }

        args.extend(invocation.suites.iter().map(OsString::from));
        args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.base_args);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Spawn {
            command: self.program.clone(),
            source,
        }
    }

    fn output_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Output {
            command: self.program.clone(),
            source,
        }
    }
}

impl ExecutionEngine for RobotProcessEngine {
    fn run(&self, invocation: &EngineInvocation<'_>) -> Result<EngineOutput, EngineError> {
        let args = self.build_args(invocation);
        debug!(program = %self.program, args = ?args, "Launching engine");

        // stdout and stderr share one pipe so their lines stay in order
        let (mut reader, writer) = io::pipe().map_err(|e| self.spawn_error(e))?;
        let stderr = writer.try_clone().map_err(|e| self.spawn_error(e))?;

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .current_dir(invocation.workspace)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr);
        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;
        // The command holds write ends of the pipe until dropped
        drop(command);

        let mut combined_output = Vec::new();
        if let Err(e) = reader.read_to_end(&mut combined_output) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(self.output_error(e));
        }
        let status = child.wait().map_err(|e| self.output_error(e))?;

        match status.code() {
            Some(return_code) => Ok(EngineOutput {
                combined_output,
                return_code,
            }),
            None => Err(EngineError::Terminated {
                output: combined_output,
            }),
        }
    }
}
