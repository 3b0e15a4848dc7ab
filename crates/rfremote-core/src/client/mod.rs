//! Client side of a remote run: discovery, packaging and the RPC call.

mod address;
mod error;
mod transport;

pub use address::normalize_address;
pub use error::ClientError;
pub use transport::{HttpTransport, RpcTransport};

use std::path::PathBuf;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info};

use crate::packager::SuiteHierarchyPackager;
use crate::resolver::DependencyResolver;
use crate::rpc::{ExecutionRequest, ExecutionResponse, RunOptions};
use crate::storage::{normalize_path, FileStore};
use crate::suite::{SuiteDiscovery, SuiteNode};

/// Turns a suite tree into an [`ExecutionRequest`].
pub struct ExecutionRequestBuilder<S: FileStore> {
    resolver: DependencyResolver<S>,
}

impl<S: FileStore> ExecutionRequestBuilder<S> {
    pub fn new(resolver: DependencyResolver<S>) -> Self {
        Self { resolver }
    }

    /// Packages every leaf suite of `root` with a fresh dependency cache.
    ///
    /// Fails with [`ClientError::NoSuitesFound`] when the tree has no suite
    /// with tests.
    pub fn build(
        &self,
        root: &SuiteNode,
        run_options: RunOptions,
        debug: bool,
    ) -> Result<ExecutionRequest, ClientError> {
        if root.leaf_suite_count() == 0 {
            return Err(ClientError::NoSuitesFound);
        }

        let packaged = SuiteHierarchyPackager::new(&self.resolver).package(root)?;

        info!(
            suites = packaged.suites.len(),
            dependencies = packaged.dependencies.len(),
            unresolved = packaged.warnings.len(),
            "Packaged suites"
        );

        Ok(ExecutionRequest {
            suites: packaged.suites,
            dependencies: packaged.dependencies,
            run_options,
            debug,
        })
    }
}

/// Runs local suites on a remote agent.
pub struct RemoteRunnerClient<D, S, T>
where
    D: SuiteDiscovery,
    S: FileStore,
    T: RpcTransport,
{
    discovery: D,
    builder: ExecutionRequestBuilder<S>,
    transport: T,
}

impl<D, S, T> RemoteRunnerClient<D, S, T>
where
    D: SuiteDiscovery,
    S: FileStore,
    T: RpcTransport,
{
    pub fn new(discovery: D, resolver: DependencyResolver<S>, transport: T) -> Self {
        Self {
            discovery,
            builder: ExecutionRequestBuilder::new(resolver),
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Discovers and packages the suites under `suite_paths` without sending them.
    pub fn prepare(
        &self,
        suite_paths: &[PathBuf],
        run_options: RunOptions,
        debug: bool,
    ) -> Result<ExecutionRequest, ClientError> {
        let paths = suite_paths
            .iter()
            .map(|p| normalize_path(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ClientError::Path)?;

        let root = self.discovery.discover(&paths)?;
        debug!(root = %root.name, leaf_suites = root.leaf_suite_count(), "Suite tree ready");

        self.builder.build(&root, run_options, debug)
    }

    /// Packages the suites and runs them on the agent.
    ///
    /// Packaging reads the suite tree from disk, so on a multi-threaded
    /// runtime it runs in a blocking section. The response is returned as
    /// received; persisting artifacts is up to the caller.
    pub async fn execute_run(
        &self,
        suite_paths: &[PathBuf],
        run_options: RunOptions,
        debug: bool,
    ) -> Result<ExecutionResponse, ClientError> {
        let request = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| self.prepare(suite_paths, run_options, debug))?
            }
            _ => self.prepare(suite_paths, run_options, debug)?,
        };
        self.transport.execute_robot_run(&request).await
    }
}
