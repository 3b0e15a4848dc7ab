//! `rfremote run`: package local suites, execute them remotely and save
//! the artifacts.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use rfremote_core::artifacts::{ArtifactWriter, OutputLocations};
use rfremote_core::client::{HttpTransport, RemoteRunnerClient};
use rfremote_core::resolver::DependencyResolver;
use rfremote_core::rpc::RunOptions;
use rfremote_core::storage::LocalFileStore;
use rfremote_core::suite::{DiscoveryOptions, FsSuiteDiscovery};
use rfremote_core::Config;
use tracing::debug;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Agent host or IP, optionally with `:<port>` (default port 1471)
    pub host: String,

    /// Suite files or directories containing suites
    #[arg(required = true)]
    pub suites: Vec<PathBuf>,

    /// Enable debug logging and keep the workspace on the agent
    #[arg(long)]
    pub debug: bool,

    /// Local directory for the retrieved artifacts (default: current directory)
    #[arg(short = 'd', long)]
    pub outputdir: Option<PathBuf>,

    /// Local path for output.xml (default: remote_output.xml)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Local path for log.html (default: remote_log.html)
    #[arg(short = 'l', long)]
    pub log: Option<PathBuf>,

    /// Local path for report.html (default: remote_report.html)
    #[arg(short = 'r', long)]
    pub report: Option<PathBuf>,

    /// Suite file extensions to parse in directories, colon separated (`robot:txt`)
    #[arg(short = 'F', long)]
    pub extension: Option<String>,

    /// Select suites by name, colon separated (`X.Y:Z`)
    #[arg(short = 's', long)]
    pub suite: Option<String>,

    /// Select tests by name, colon separated (`Foo*:Bar*`)
    #[arg(short = 't', long)]
    pub test: Option<String>,

    /// Select tests by tag
    #[arg(short = 'i', long)]
    pub include: Option<String>,

    /// Skip tests by tag
    #[arg(short = 'e', long)]
    pub exclude: Option<String>,

    /// Engine log level, e.g. `DEBUG` or `DEBUG:INFO`
    #[arg(short = 'L', long)]
    pub loglevel: Option<String>,

    /// Seconds to wait for the agent before giving up (default: wait forever)
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl RunArgs {
    fn suite_patterns(&self) -> Vec<String> {
        split_list(self.suite.as_deref())
    }

    /// Options forwarded to the engine on the agent.
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new();
        if self.suite.is_some() {
            options.insert("suite", self.suite_patterns());
        }
        if self.test.is_some() {
            options.insert("test", split_list(self.test.as_deref()));
        }
        options.insert_opt("include", self.include.clone());
        options.insert_opt("exclude", self.exclude.clone());
        options.insert_opt("loglevel", self.loglevel.clone());
        options
    }

    pub fn output_locations(&self) -> OutputLocations {
        OutputLocations {
            output_dir: self.outputdir.clone(),
            output: self.output.clone(),
            log: self.log.clone(),
            report: self.report.clone(),
        }
    }

    fn discovery_options(&self, config: &Config) -> DiscoveryOptions {
        let extensions = self
            .extension
            .clone()
            .unwrap_or_else(|| config.client.default_extensions.join(":"));
        DiscoveryOptions::new(Some(&extensions), self.suite_patterns())
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(':')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Runs the suites remotely and returns the engine's return code.
pub async fn execute(args: RunArgs, config: &Config) -> Result<i32> {
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .or_else(|| config.client.timeout());

    let discovery = FsSuiteDiscovery::new(args.discovery_options(config))?;
    let resolver = DependencyResolver::with_config(LocalFileStore::new(), config.resolver.clone());
    let transport = HttpTransport::new(&args.host, config.client.default_port, timeout)?;
    debug!(agent = %transport.base_url(), "Connecting to agent");

    let client = RemoteRunnerClient::new(discovery, resolver, transport);
    let response = client
        .execute_run(&args.suites, args.run_options(), args.debug)
        .await?;

    // Output first, so a failed artifact write still leaves diagnostics
    println!("{}", response.combined_output_lossy());

    let writer = ArtifactWriter::new(LocalFileStore::new(), args.output_locations());
    let written = writer
        .write(&response)
        .wrap_err("Failed to save artifacts")?;
    for artifact in &written {
        println!("{:<8} {}", format!("{}:", artifact.kind), artifact.path.display());
    }

    Ok(response.return_code)
}
