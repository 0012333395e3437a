use std::{fmt, time::Duration};

use async_trait::async_trait;
use cohort_primitives::OperatorPeerInfo;
use cohort_rpc_api::ExecutorApiClient;
use cohort_rpc_types::{RpcTaskSubmission, SubmitAck};
use dashmap::DashMap;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use tracing::debug;

use crate::errors::ExecutorClientError;

pub const DEFAULT_EXECUTOR_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers tasks to executor operators.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ExecutorClient: Send + Sync + 'static {
    async fn submit_task(
        &self,
        peer: &OperatorPeerInfo,
        submission: RpcTaskSubmission,
    ) -> Result<SubmitAck, ExecutorClientError>;
}

/// [`ExecutorClient`] calling `executor_submitTask` over HTTP JSON-RPC.
///
/// One client is kept per network address.
pub struct RpcExecutorClient {
    request_timeout: Duration,
    clients: DashMap<String, HttpClient>,
}

impl Default for RpcExecutorClient {
    fn default() -> Self {
        Self::with_request_timeout(DEFAULT_EXECUTOR_REQUEST_TIMEOUT)
    }
}

impl fmt::Debug for RpcExecutorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcExecutorClient")
            .field("request_timeout", &self.request_timeout)
            .field("clients", &self.clients.len())
            .finish()
    }
}

impl RpcExecutorClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds how long a single `executor_submitTask` call may take.
    pub fn with_request_timeout(request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            clients: DashMap::new(),
        }
    }

    fn client_for(&self, network_address: &str) -> Result<HttpClient, ExecutorClientError> {
        if let Some(client) = self.clients.get(network_address) {
            return Ok(client.clone());
        }

        let url = executor_url(network_address);
        let client = HttpClientBuilder::default()
            .request_timeout(self.request_timeout)
            .build(&url)
            .map_err(|e| ExecutorClientError::Connect {
                address: url.clone(),
                reason: e.to_string(),
            })?;
        debug!(%url, "created executor client");
        self.clients
            .insert(network_address.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl ExecutorClient for RpcExecutorClient {
    async fn submit_task(
        &self,
        peer: &OperatorPeerInfo,
        submission: RpcTaskSubmission,
    ) -> Result<SubmitAck, ExecutorClientError> {
        let client = self.client_for(&peer.network_address)?;
        client
            .submit_task(submission)
            .await
            .map_err(|e| ExecutorClientError::Rpc(e.to_string()))
    }
}

fn executor_url(network_address: &str) -> String {
    if network_address.starts_with("http://") || network_address.starts_with("https://") {
        network_address.to_string()
    } else {
        format!("http://{network_address}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_url_defaults_to_http() {
        assert_eq!(executor_url("127.0.0.1:9000"), "http://127.0.0.1:9000");
        assert_eq!(executor_url("https://exec.example"), "https://exec.example");
    }

    #[tokio::test]
    async fn test_clients_are_cached_per_address() {
        let client = RpcExecutorClient::new();
        client.client_for("127.0.0.1:9000").unwrap();
        client.client_for("127.0.0.1:9000").unwrap();
        client.client_for("127.0.0.1:9001").unwrap();
        assert_eq!(client.clients.len(), 2);
    }
}
