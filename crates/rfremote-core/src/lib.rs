pub mod agent;
pub mod artifacts;
pub mod client;
pub mod config;
pub mod packager;
pub mod resolver;
pub mod rpc;
pub mod storage;
pub mod suite;

pub use agent::{ExecutionEngine, ExecutionOrchestrator, RobotProcessEngine, WorkspaceManager};
pub use artifacts::{ArtifactWriter, OutputLocations};
pub use client::{ExecutionRequestBuilder, HttpTransport, RemoteRunnerClient, RpcTransport};
pub use config::Config;
pub use packager::SuiteHierarchyPackager;
pub use resolver::{DependencyCache, DependencyResolver};
pub use rpc::{ExecutionRequest, ExecutionResponse};
pub use storage::{FileStore, LocalFileStore};
pub use suite::{FsSuiteDiscovery, SuiteDiscovery, SuiteNode};
