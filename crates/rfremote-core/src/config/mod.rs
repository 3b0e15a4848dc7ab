//! Configuration management for rfremote.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `rfremote.toml` file
//! 3. User config `~/.config/rfremote/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Client (executor) configuration.
    pub client: ClientConfig,

    /// Dependency resolution configuration.
    pub resolver: ResolverConfig,

    /// Agent configuration.
    pub agent: AgentConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./rfremote.toml` (project local)
    /// 2. `~/.config/rfremote/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("rfremote.toml").exists() {
            return Self::from_file("rfremote.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("rfremote").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(secs) = std::env::var("RFREMOTE_TIMEOUT_SECS") {
            if let Ok(n) = secs.parse() {
                self.client.timeout_secs = Some(n);
            }
        }

        if let Ok(command) = std::env::var("RFREMOTE_ROBOT_COMMAND") {
            self.agent.robot_command = command;
        }
        if let Ok(root) = std::env::var("RFREMOTE_WORKSPACE_ROOT") {
            self.agent.workspace_root = Some(PathBuf::from(root));
        }
        if let Ok(port) = std::env::var("RFREMOTE_AGENT_PORT") {
            if let Ok(n) = port.parse() {
                self.agent.port = n;
            }
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Port appended to agent addresses that do not carry one.
    pub default_port: u16,

    /// RPC timeout in seconds. `None` blocks until the agent answers.
    pub timeout_secs: Option<u64>,

    /// Suite extensions used when `--extension` is not given.
    pub default_extensions: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            timeout_secs: None,
            default_extensions: DEFAULT_SUITE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClientConfig {
    /// The RPC timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Dependency resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Names assumed installed on every agent; rewritten but never shipped.
    pub stdlib_names: Vec<String>,

    /// Path segments identifying installed third-party packages.
    pub installed_package_markers: Vec<String>,

    /// Extensions tried for Resource references written without one.
    pub resource_extensions: Vec<String>,

    /// Directories searched after the importing document's own directory.
    pub search_paths: Vec<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            stdlib_names: DEFAULT_STDLIB_NAMES.iter().map(|s| s.to_string()).collect(),
            installed_package_markers: DEFAULT_INSTALLED_PACKAGE_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            resource_extensions: DEFAULT_RESOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            search_paths: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Whether `name` is part of the standard-library allow-list.
    pub fn is_stdlib(&self, name: &str) -> bool {
        self.stdlib_names.iter().any(|s| s == name)
    }

    /// Whether `path` lives inside an installed package directory.
    pub fn is_installed_package(&self, path: &Path) -> bool {
        path.components().any(|c| {
            let segment = c.as_os_str().to_string_lossy().to_lowercase();
            self.installed_package_markers
                .iter()
                .any(|m| segment == m.to_lowercase())
        })
    }
}

/// Agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Address to bind to.
    pub address: String,

    /// Port to listen on.
    pub port: u16,

    /// Command launching the test engine.
    pub robot_command: String,

    /// Parent directory for workspaces. Defaults to the system temp dir.
    pub workspace_root: Option<PathBuf>,

    /// Largest accepted request body in bytes.
    pub max_request_bytes: usize,

    /// Environment variable holding the engine's module search path.
    pub search_path_var: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_AGENT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            robot_command: DEFAULT_ROBOT_COMMAND.to_string(),
            workspace_root: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            search_path_var: DEFAULT_SEARCH_PATH_VAR.to_string(),
        }
    }
}

impl AgentConfig {
    /// Directory under which workspaces are allocated.
    pub fn workspace_root_or_default(&self) -> PathBuf {
        self.workspace_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.client.default_port, DEFAULT_PORT);
        assert_eq!(config.agent.robot_command, DEFAULT_ROBOT_COMMAND);
        assert!(config.resolver.is_stdlib("Collections"));
        assert!(config.client.timeout().is_none());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[client]"));
        assert!(toml_str.contains("[resolver]"));
        assert!(toml_str.contains("[agent]"));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[client]
timeout_secs = 600

[resolver]
stdlib_names = ["BuiltIn"]

[agent]
port = 8270
robot_command = "/opt/venv/bin/robot"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.client.timeout(), Some(Duration::from_secs(600)));
        assert!(config.resolver.is_stdlib("BuiltIn"));
        assert!(!config.resolver.is_stdlib("Collections"));
        assert_eq!(config.agent.port, 8270);
        assert_eq!(config.agent.robot_command, "/opt/venv/bin/robot");
        // Untouched sections keep their defaults
        assert_eq!(config.client.default_port, DEFAULT_PORT);
    }

    #[test]
    fn test_installed_package_detection() {
        let config = ResolverConfig::default();
        assert!(config.is_installed_package(Path::new(
            "/usr/lib/python3/dist-packages/SeleniumLibrary/__init__.py"
        )));
        assert!(config.is_installed_package(Path::new("/venv/lib/Site-Packages/foo.py")));
        assert!(!config.is_installed_package(Path::new("/work/site-packages-mirror/foo.py")));
    }
}
