//! Minimal view of an EVM JSON-RPC node used by the poller.

use std::fmt;

use alloy_primitives::{Address, B256, U64};
use alloy_rpc_types_eth::{Filter, Log};
use async_trait::async_trait;
use cohort_primitives::{ChainId, EthBlock};
use jsonrpsee::{
    core::client::ClientT,
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use serde::Deserialize;

use crate::errors::ChainClientError;

/// Logs emitted by one contract over an inclusive block range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    pub fn single_block(address: Address, block: u64) -> Self {
        Self {
            address,
            from_block: block,
            to_block: block,
        }
    }
}

impl From<LogFilter> for Filter {
    fn from(value: LogFilter) -> Self {
        Filter::new()
            .address(value.address)
            .from_block(value.from_block)
            .to_block(value.to_block)
    }
}

#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Height of the chain tip as seen by the node.
    async fn block_number(&self) -> Result<u64, ChainClientError>;

    /// Header of block `number`, or `None` if the node does not have it.
    async fn block_by_number(&self, number: u64) -> Result<Option<EthBlock>, ChainClientError>;

    async fn logs(&self, filter: LogFilter) -> Result<Vec<Log>, ChainClientError>;
}

/// Header fields of an `eth_getBlockByNumber` response. Everything else is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockHeader {
    number: U64,
    hash: B256,
    parent_hash: B256,
    timestamp: U64,
}

impl RpcBlockHeader {
    fn into_block(self, chain_id: ChainId) -> EthBlock {
        EthBlock {
            chain_id,
            number: self.number.to(),
            hash: self.hash,
            parent_hash: self.parent_hash,
            timestamp: self.timestamp.to(),
        }
    }
}

/// [`ChainClient`] backed by a JSON-RPC HTTP endpoint.
pub struct RpcChainClient {
    chain_id: ChainId,
    url: String,
    client: HttpClient,
}

impl fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("chain_id", &self.chain_id)
            .field("url", &self.url)
            .finish()
    }
}

impl RpcChainClient {
    pub fn new(chain_id: ChainId, url: impl Into<String>) -> Result<Self, ChainClientError> {
        let url = url.into();
        let client = HttpClientBuilder::default()
            .build(&url)
            .map_err(|e| ChainClientError::transport(format!("{url}: {e}")))?;
        Ok(Self {
            chain_id,
            url,
            client,
        })
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self) -> Result<u64, ChainClientError> {
        let number: U64 = self.client.request("eth_blockNumber", rpc_params![]).await?;
        Ok(number.to())
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<EthBlock>, ChainClientError> {
        let header: Option<RpcBlockHeader> = self
            .client
            .request("eth_getBlockByNumber", rpc_params![U64::from(number), false])
            .await?;
        Ok(header.map(|h| h.into_block(self.chain_id)))
    }

    async fn logs(&self, filter: LogFilter) -> Result<Vec<Log>, ChainClientError> {
        let filter: Filter = filter.into();
        let logs = self.client.request("eth_getLogs", rpc_params![filter]).await?;
        Ok(logs)
    }
}
