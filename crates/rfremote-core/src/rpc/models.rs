//! Request and response types of the `execute_robot_run` RPC.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::encoding::base64_bytes;
use crate::resolver::Dependency;

// =============================================================================
// Request
// =============================================================================

/// One leaf suite, rewritten, with its place in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagedSuite {
    /// Directory of the suite relative to the tree root, `/`-separated.
    /// Empty for suites that sit directly in the workspace root.
    pub relative_path: String,
    /// Rewritten suite text.
    pub suite_data: String,
}

/// Value of a run option: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Single(String),
    Multiple(Vec<String>),
}

impl OptionValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            OptionValue::Single(value) => vec![value.as_str()],
            OptionValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Single(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Single(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(values: Vec<String>) -> Self {
        OptionValue::Multiple(values)
    }
}

/// Filter and behaviour options forwarded to the test engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunOptions(BTreeMap<String, OptionValue>);

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Adds the option when a value is present.
    pub fn insert_opt(&mut self, name: impl Into<String>, value: Option<impl Into<OptionValue>>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the agent needs to run a set of suites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Leaf suites keyed by file name.
    pub suites: BTreeMap<String, PackagedSuite>,
    /// Shared dependencies keyed by basename, materialized flat.
    pub dependencies: BTreeMap<String, Dependency>,
    pub run_options: RunOptions,
    /// Keep the workspace on the agent after the run.
    pub debug: bool,
}

// =============================================================================
// Response
// =============================================================================

/// Output of a run. Artifacts the engine did not write are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    /// Engine stdout and stderr in the order they were written.
    #[serde(with = "base64_bytes")]
    pub combined_output: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub output_xml: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub log_html: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub report_html: Vec<u8>,
    pub return_code: i32,
}

impl ExecutionResponse {
    /// Combined output as text, with invalid UTF-8 replaced.
    pub fn combined_output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.combined_output).into_owned()
    }
}

/// Body of a failed RPC. The message is deliberately terse; details stay
/// in the agent's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFault {
    pub fault: String,
}
