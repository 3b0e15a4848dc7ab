//! HTTP agent serving `execute_robot_run`.
//!
//! # Module Structure
//!
//! - `handlers` - HTTP route handlers
//! - `models` - response types that are not part of the RPC model

mod handlers;
mod models;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use tower_http::trace::TraceLayer;
use tracing::info;

use rfremote_core::agent::{
    ExecutionEngine, ExecutionOrchestrator, RobotProcessEngine, WorkspaceManager,
};
use rfremote_core::config::EXECUTE_ROBOT_RUN_PATH;
use rfremote_core::Config;

// =============================================================================
// Application State
// =============================================================================

/// Shared state of the agent.
pub struct AppState<E: ExecutionEngine> {
    pub orchestrator: ExecutionOrchestrator<E>,
    /// Version line reported by the engine at startup.
    pub engine_version: String,
    /// Keep every workspace, whatever the request says.
    pub keep_workspaces: bool,
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Address to bind to (default: 0.0.0.0)
    #[arg(short = 'a', long)]
    pub address: Option<String>,

    /// Port to listen on (default: 1471)
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Enable debug logging and keep every workspace after its run
    #[arg(short = 'd', long)]
    pub debug: bool,
}

// =============================================================================
// Server Entry Point
// =============================================================================

/// Builds the agent's router.
pub fn router<E: ExecutionEngine + 'static>(state: Arc<AppState<E>>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(EXECUTE_ROBOT_RUN_PATH, post(handlers::execute_robot_run::<E>))
        .route("/health", get(handlers::health::<E>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Probes the engine and serves requests until the process is stopped.
pub async fn start_agent(args: AgentArgs, config: &Config) -> Result<()> {
    let agent = &config.agent;

    let engine = RobotProcessEngine::from_config(agent)?;
    let engine_version = engine
        .probe()
        .wrap_err_with(|| format!("Cannot run test engine '{}'", agent.robot_command))?;

    let orchestrator = ExecutionOrchestrator::new(WorkspaceManager::from_config(agent), engine)
        .with_search_path_var(agent.search_path_var.clone());

    let state = Arc::new(AppState {
        orchestrator,
        engine_version: engine_version.clone(),
        keep_workspaces: args.debug,
    });
    let app = router(state, agent.max_request_bytes);

    let address = args.address.unwrap_or_else(|| agent.address.clone());
    let port = args.port.unwrap_or(agent.port);
    let bind = format!("{}:{}", address, port);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", bind))?;

    info!(engine = %engine_version, workspaces = %agent.workspace_root_or_default().display(), "Agent ready");
    println!("Listening on {}", bind);
    println!("Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;

    Ok(())
}
