use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use rfremote_core::client::{ClientError, RemoteRunnerClient, RpcTransport};
use rfremote_core::resolver::{Dependency, DependencyResolver};
use rfremote_core::rpc::{ExecutionRequest, ExecutionResponse, RunOptions};
use rfremote_core::storage::LocalFileStore;
use rfremote_core::suite::{DiscoveryOptions, FsSuiteDiscovery};
use tempfile::TempDir;

/// Records requests instead of sending them.
#[derive(Default)]
struct FakeTransport {
    sent: Mutex<Vec<ExecutionRequest>>,
}

#[async_trait]
impl RpcTransport for FakeTransport {
    async fn execute_robot_run(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, ClientError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(ExecutionResponse {
            combined_output: b"2 tests, 2 passed".to_vec(),
            return_code: 0,
            ..Default::default()
        })
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn client(suites: &[&str]) -> RemoteRunnerClient<FsSuiteDiscovery, LocalFileStore, FakeTransport> {
    let options = DiscoveryOptions::new(None, suites.iter().map(|s| s.to_string()).collect());
    RemoteRunnerClient::new(
        FsSuiteDiscovery::new(options).unwrap(),
        DependencyResolver::new(LocalFileStore::new()),
        FakeTransport::default(),
    )
}

/// root/{S.robot, sub/T.robot} with S importing lib/Util.robot, which
/// imports lib/Helpers.py.
fn example_tree(root: &Path) {
    write(
        root,
        "S.robot",
        "*** Settings ***\nResource    lib/Util.robot\n\n*** Test Cases ***\nS Test\n    Util\n",
    );
    write(root, "sub/T.robot", "*** Test Cases ***\nT Test\n    No Operation\n");
    write(
        root,
        "lib/Util.robot",
        "*** Settings ***\nLibrary    ./Helpers.py\n\n*** Keywords ***\nUtil\n    Helper\n",
    );
    write(root, "lib/Helpers.py", "def helper():\n    pass\n");
}

#[tokio::test]
async fn test_execute_run_packages_example_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    example_tree(root);

    let client = client(&[]);
    let mut options = RunOptions::new();
    options.insert("loglevel", "DEBUG");

    let response = client
        .execute_run(&[root.to_path_buf()], options, false)
        .await
        .unwrap();
    assert_eq!(response.combined_output_lossy(), "2 tests, 2 passed");

    let sent = client_sent(&client);
    assert_eq!(sent.len(), 1);
    let transport_sent = &sent[0];

    let suites: Vec<(&str, &str)> = transport_sent
        .suites
        .iter()
        .map(|(name, suite)| (name.as_str(), suite.relative_path.as_str()))
        .collect();
    assert_eq!(suites, vec![("S.robot", ""), ("T.robot", "sub")]);
    assert!(transport_sent.suites["S.robot"]
        .suite_data
        .contains("Resource    Util.robot\n"));

    let deps: Vec<&str> = transport_sent.dependencies.keys().map(String::as_str).collect();
    assert_eq!(deps, vec!["Helpers.py", "Util.robot"]);
    match &transport_sent.dependencies["Util.robot"] {
        Dependency::Text(text) => assert!(text.contains("Library    Helpers.py\n")),
        other => panic!("expected text dependency, got {:?}", other),
    }
    assert_eq!(
        transport_sent.dependencies["Helpers.py"],
        Dependency::Binary(b"def helper():\n    pass\n".to_vec())
    );
    assert!(transport_sent.run_options.get("loglevel").is_some());
    assert!(!transport_sent.debug);
}

fn client_sent(
    client: &RemoteRunnerClient<FsSuiteDiscovery, LocalFileStore, FakeTransport>,
) -> Vec<ExecutionRequest> {
    client.transport().sent.lock().unwrap().clone()
}

#[tokio::test]
async fn test_no_suites_found_skips_rpc() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "only/Resource.robot", "*** Keywords ***\nK\n    No Operation\n");

    let client = client(&[]);
    let err = client
        .execute_run(&[temp_dir.path().to_path_buf()], RunOptions::new(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::NoSuitesFound));
    assert!(client_sent(&client).is_empty());
}

#[tokio::test]
async fn test_suite_filter_limits_packaged_suites() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    example_tree(root);

    let client = client(&["T"]);
    client
        .execute_run(&[root.to_path_buf()], RunOptions::new(), true)
        .await
        .unwrap();

    let sent = client_sent(&client);
    let request = &sent[0];
    assert_eq!(request.suites.keys().collect::<Vec<_>>(), vec!["T.robot"]);
    assert!(request.dependencies.is_empty());
    assert!(request.debug);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_execute_run_on_multi_thread_runtime() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    example_tree(root);

    let client = client(&[]);
    let response = client
        .execute_run(&[root.join("sub")], RunOptions::new(), false)
        .await
        .unwrap();

    assert_eq!(response.return_code, 0);
    let sent = client_sent(&client);
    assert_eq!(sent[0].suites.keys().collect::<Vec<_>>(), vec!["T.robot"]);
}

#[test]
fn test_input_paths_are_normalized() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    example_tree(root);

    // a/.. collapses before discovery sees the path
    let input: PathBuf = root.join("sub").join("..").join("sub").join("T.robot");
    let request = client(&[])
        .prepare(&[input], RunOptions::new(), false)
        .unwrap();

    assert_eq!(request.suites["T.robot"].relative_path, "");
}

#[test]
fn test_missing_suite_path() {
    let temp_dir = TempDir::new().unwrap();
    let err = client(&[])
        .prepare(&[temp_dir.path().join("missing")], RunOptions::new(), false)
        .unwrap_err();
    assert!(matches!(err, ClientError::Discovery(_)));
}
