use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{normalize_address, ClientError};
use crate::config::EXECUTE_ROBOT_RUN_PATH;
use crate::rpc::{ExecutionRequest, ExecutionResponse, RpcFault};

/// A request/response channel to an agent.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn execute_robot_run(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, ClientError>;
}

/// JSON over HTTP transport.
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport for `address`, adding the default port and scheme
    /// when missing. Without a timeout the call blocks until the agent answers.
    pub fn new(
        address: &str,
        default_port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let base_url = normalize_address(address, default_port)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn execute_robot_run(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, ClientError> {
        let url = format!("{}{}", self.base_url, EXECUTE_ROBOT_RUN_PATH);
        debug!(url = %url, suites = request.suites.len(), "Sending run request");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RpcFault>(&body)
                .map(|f| f.fault)
                .unwrap_or(body);
            return Err(ClientError::Fault {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}
