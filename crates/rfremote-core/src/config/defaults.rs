//! Default values for rfremote configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Client Defaults
// ============================================================================

/// Port the agent listens on when none is given in the address.
pub const DEFAULT_PORT: u16 = 1471;

/// Suite file extensions accepted by discovery when no filter is given.
pub const DEFAULT_SUITE_EXTENSIONS: &[&str] = &["robot"];

/// Local file name for the retrieved output.xml.
pub const DEFAULT_LOCAL_OUTPUT_XML: &str = "remote_output.xml";

/// Local file name for the retrieved log.html.
pub const DEFAULT_LOCAL_LOG_HTML: &str = "remote_log.html";

/// Local file name for the retrieved report.html.
pub const DEFAULT_LOCAL_REPORT_HTML: &str = "remote_report.html";

// ============================================================================
// Resolver Defaults
// ============================================================================

/// Libraries bundled with every engine installation. Never shipped.
pub const DEFAULT_STDLIB_NAMES: &[&str] = &[
    "BuiltIn",
    "Collections",
    "DateTime",
    "Dialogs",
    "Easter",
    "OperatingSystem",
    "Process",
    "Remote",
    "Reserved",
    "Screenshot",
    "String",
    "Telnet",
    "XML",
];

/// Path segments that mark a file as part of an installed third-party package.
pub const DEFAULT_INSTALLED_PACKAGE_MARKERS: &[&str] = &["site-packages", "dist-packages"];

/// Companion extensions tried for Resource references written without one.
pub const DEFAULT_RESOURCE_EXTENSIONS: &[&str] = &[".robot", ".resource", ".txt", ".tsv"];

// ============================================================================
// Agent Defaults
// ============================================================================

/// Address the agent binds to.
pub const DEFAULT_AGENT_ADDRESS: &str = "0.0.0.0";

/// Command used to launch the test engine.
pub const DEFAULT_ROBOT_COMMAND: &str = "robot";

/// Largest request body the agent accepts (64 MiB).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

/// Environment variable holding the engine's module search path.
pub const DEFAULT_SEARCH_PATH_VAR: &str = "PYTHONPATH";

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "rfremote-";

// ============================================================================
// Artifacts
// ============================================================================

/// Artifact file names the engine writes into its output directory.
pub const OUTPUT_XML: &str = "output.xml";
pub const LOG_HTML: &str = "log.html";
pub const REPORT_HTML: &str = "report.html";

/// RPC route for a robot run.
pub const EXECUTE_ROBOT_RUN_PATH: &str = "/rpc/execute_robot_run";
