//! Poller fed by hand over JSON-RPC, for chains without a live node.

use std::{net::SocketAddr, time::Duration};

use cohort_primitives::{ChainId, DecodedLog, LogWithBlock};
use cohort_rpc_api::ManualPollerApiServer;
use cohort_rpc_types::{RpcLogWithBlock, SubmitAck};
use jsonrpsee::{
    core::{async_trait, RpcResult},
    server::{ServerBuilder, ServerHandle},
};
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    errors::{PollerError, Result},
    MANUAL_ENQUEUE_TIMEOUT,
};

/// Accepts raw logs pushed through `poller_pushEvent` and forwards them as chain events.
#[derive(Clone, Debug)]
pub struct ManualPushPoller {
    chain_id: ChainId,
    event_tx: mpsc::Sender<LogWithBlock>,
    enqueue_timeout: Duration,
}

impl ManualPushPoller {
    pub fn new(chain_id: ChainId, event_tx: mpsc::Sender<LogWithBlock>) -> Self {
        Self {
            chain_id,
            event_tx,
            enqueue_timeout: MANUAL_ENQUEUE_TIMEOUT,
        }
    }

    pub fn with_enqueue_timeout(mut self, v: Duration) -> Self {
        self.enqueue_timeout = v;
        self
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Enqueues an already decoded event, giving up after the enqueue timeout.
    pub async fn push(&self, event: LogWithBlock) -> Result<()> {
        match self.event_tx.send_timeout(event, self.enqueue_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(PollerError::QueueFull),
            Err(SendTimeoutError::Closed(_)) => Err(PollerError::ChannelClosed),
        }
    }

    /// Decodes a pushed log and enqueues it.
    pub async fn push_raw(&self, event: RpcLogWithBlock) -> Result<()> {
        if event.block.chain_id != self.chain_id {
            return Err(PollerError::Rejected(format!(
                "block is for chain {}, poller serves chain {}",
                event.block.chain_id, self.chain_id
            )));
        }
        let log = DecodedLog::from_rpc(&event.log)
            .map_err(|e| PollerError::Rejected(format!("undecodable log: {e}")))?;
        self.push(LogWithBlock {
            log,
            block: event.block,
        })
        .await
    }

    /// Serves `poller_pushEvent` on `addr` until `cancel` fires. Returns the bound address.
    pub async fn serve(
        self,
        addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Result<(SocketAddr, ServerHandle)> {
        let server = ServerBuilder::default()
            .build(addr)
            .await
            .map_err(|e| PollerError::Server(format!("failed to bind {addr}: {e}")))?;
        let local_addr = server.local_addr().unwrap_or(addr);
        let chain_id = self.chain_id;

        let handle = server.start(self.into_rpc());
        info!(%chain_id, %local_addr, "manual push poller listening");

        let stop_handle = handle.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            info!(%chain_id, "stopping manual push poller");
            let _ = stop_handle.stop();
        });

        Ok((local_addr, handle))
    }
}

#[async_trait]
impl ManualPollerApiServer for ManualPushPoller {
    async fn push_event(&self, event: RpcLogWithBlock) -> RpcResult<SubmitAck> {
        let block = event.block.number;
        match self.push_raw(event).await {
            Ok(()) => {
                info!(chain_id = %self.chain_id, %block, "enqueued pushed event");
                Ok(SubmitAck::accepted())
            }
            Err(err) => {
                warn!(chain_id = %self.chain_id, %block, %err, "rejected pushed event");
                Ok(SubmitAck::rejected(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, B256};
    use cohort_primitives::{test_utils::*, ChainEvent, TaskId};

    use super::*;
    use crate::test_utils::rpc_log;

    const CHAIN: ChainId = ChainId::ETHEREUM_ANVIL;

    fn pushed_task(chain_id: ChainId) -> RpcLogWithBlock {
        let raw = raw_task_created_log(
            Address::repeat_byte(0xee),
            TaskId::new(B256::repeat_byte(3)),
            Address::repeat_byte(0x0a),
            1,
            u64::MAX,
            b"payload",
        );
        RpcLogWithBlock {
            log: rpc_log(raw, 7, 0),
            block: make_block(chain_id, 7),
        }
    }

    #[tokio::test]
    async fn test_push_event_enqueues_decoded_log() {
        let (event_tx, mut event_rx) = mpsc::channel(4);
        let poller = ManualPushPoller::new(CHAIN, event_tx);

        let ack = poller.push_event(pushed_task(CHAIN)).await.unwrap();
        assert!(ack.success);

        let event = event_rx.try_recv().unwrap();
        assert_eq!(event.block.number, 7);
        assert!(matches!(event.log.event, ChainEvent::TaskCreated(_)));
    }

    #[tokio::test]
    async fn test_full_queue_is_negative_ack() {
        let (event_tx, _event_rx) = mpsc::channel(1);
        let poller = ManualPushPoller::new(CHAIN, event_tx)
            .with_enqueue_timeout(Duration::from_millis(20));

        assert!(poller.push_event(pushed_task(CHAIN)).await.unwrap().success);
        let ack = poller.push_event(pushed_task(CHAIN)).await.unwrap();
        assert!(!ack.success);
        assert_eq!(ack.message.as_deref(), Some("event queue full"));
    }

    #[tokio::test]
    async fn test_foreign_chain_is_rejected() {
        let (event_tx, mut event_rx) = mpsc::channel(4);
        let poller = ManualPushPoller::new(CHAIN, event_tx);

        let ack = poller
            .push_event(pushed_task(ChainId::ETHEREUM_HOLESKY))
            .await
            .unwrap();
        assert!(!ack.success);
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_served_over_http_until_cancelled() {
        use cohort_rpc_api::ManualPollerApiClient;
        use jsonrpsee::http_client::HttpClientBuilder;

        let (event_tx, mut event_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let (addr, handle) = ManualPushPoller::new(CHAIN, event_tx)
            .serve(SocketAddr::from(([127, 0, 0, 1], 0)), cancel.clone())
            .await
            .unwrap();

        let client = HttpClientBuilder::default()
            .build(format!("http://{addr}"))
            .unwrap();
        let ack = client.push_event(pushed_task(CHAIN)).await.unwrap();
        assert!(ack.success);
        assert_eq!(event_rx.recv().await.unwrap().block.number, 7);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle.stopped())
            .await
            .unwrap();
    }
}
