//! HTTP route handlers for the agent.
//!
//! Handlers are kept thin; a run is delegated to the orchestrator on a
//! blocking worker.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use super::models::HealthResponse;
use super::AppState;

use rfremote_core::agent::ExecutionEngine;
use rfremote_core::rpc::{ExecutionRequest, ExecutionResponse, RpcFault};

type RpcResult = Result<Json<ExecutionResponse>, (StatusCode, Json<RpcFault>)>;

fn fault(message: impl Into<String>) -> (StatusCode, Json<RpcFault>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(RpcFault {
            fault: message.into(),
        }),
    )
}

/// POST `/rpc/execute_robot_run` - Materializes, runs and harvests one request.
pub async fn execute_robot_run<E: ExecutionEngine + 'static>(
    State(state): State<Arc<AppState<E>>>,
    Json(mut request): Json<ExecutionRequest>,
) -> RpcResult {
    request.debug |= state.keep_workspaces;

    let outcome =
        tokio::task::spawn_blocking(move || state.orchestrator.execute_robot_run(&request)).await;

    match outcome {
        Ok(Ok(response)) => Ok(Json(response)),
        // Already logged in full by the orchestrator
        Ok(Err(e)) => Err(fault(e.fault_message())),
        Err(e) => {
            error!(error = %e, "Run worker panicked");
            Err(fault("Run aborted on agent"))
        }
    }
}

/// GET `/health` - Reports the engine detected at startup.
pub async fn health<E: ExecutionEngine + 'static>(
    State(state): State<Arc<AppState<E>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        engine: state.engine_version.clone(),
        agent: env!("CARGO_PKG_VERSION").to_string(),
    })
}
