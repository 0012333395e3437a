//! Manual poller that also mints a synthetic task on a fixed interval.

use std::{
    future::Future,
    net::SocketAddr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use cohort_primitives::{
    ChainEvent, ChainId, DecodedLog, EthBlock, LogWithBlock, OperatorSetId, TaskCreatedEvent,
    TaskId,
};
use jsonrpsee::server::ServerHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    errors::{PollerError, Result},
    manual::ManualPushPoller,
};

/// How long a synthetic task stays open.
const SIMULATED_TASK_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone, Debug)]
pub struct SimulatedTaskConfig {
    /// Time between synthetic tasks. Must be non-zero.
    pub task_interval: Duration,
    /// Every AVS receives its own task on each tick.
    pub avs_addresses: Vec<Address>,
    /// Emitting contract of the synthetic logs. Execution managers only pick up tasks from
    /// mailboxes they watch.
    pub mailbox: Address,
    pub operator_set_id: OperatorSetId,
}

#[derive(Debug)]
pub struct SimulatedPoller {
    manual: ManualPushPoller,
    config: SimulatedTaskConfig,
}

impl SimulatedPoller {
    pub fn new(manual: ManualPushPoller, config: SimulatedTaskConfig) -> Result<Self> {
        if config.task_interval.is_zero() {
            return Err(PollerError::InvalidConfig(
                "task interval must be greater than 0".to_string(),
            ));
        }
        Ok(Self { manual, config })
    }

    pub fn chain_id(&self) -> ChainId {
        self.manual.chain_id()
    }

    /// Starts the push endpoint and returns the task generating periodic tasks.
    pub async fn start(
        self,
        addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Result<(SocketAddr, ServerHandle, impl Future<Output = ()>)> {
        let (local_addr, handle) = self.manual.clone().serve(addr, cancel.clone()).await?;
        Ok((local_addr, handle, self.generate_periodic_tasks(cancel)))
    }

    /// Emits one synthetic task per AVS every interval until cancelled or the queue closes.
    pub async fn generate_periodic_tasks(self, cancel: CancellationToken) {
        let chain_id = self.chain_id();
        info!(%chain_id, interval_ms = self.config.task_interval.as_millis() as u64, "starting periodic task generation");

        let mut ticker = tokio::time::interval(self.config.task_interval);
        // first tick of an interval completes immediately
        ticker.tick().await;

        let mut block_number = 0u64;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            block_number += 1;
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            let block = synthetic_block(chain_id, block_number, now.as_secs());

            for (idx, avs) in self.config.avs_addresses.iter().enumerate() {
                let event = self.synthetic_task(*avs, idx as u64, &block);
                let ChainEvent::TaskCreated(task) = &event.log.event else {
                    continue;
                };
                let task_id = task.task_id;
                match self.manual.push(event).await {
                    Ok(()) => info!(%chain_id, %task_id, %avs, "generated periodic task"),
                    Err(PollerError::ChannelClosed) => {
                        warn!(%chain_id, "event queue closed, stopping periodic task generation");
                        return;
                    }
                    Err(err) => warn!(%chain_id, %task_id, %err, "failed to enqueue periodic task"),
                }
            }
        }

        info!(%chain_id, "stopping periodic task generation");
    }

    fn synthetic_task(&self, avs: Address, log_index: u64, block: &EthBlock) -> LogWithBlock {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let task_id = TaskId::new(keccak256(format!("periodic-task-{}", now.as_nanos())));
        let payload = format!(r#"{{"type":"periodic","timestamp":{}}}"#, now.as_secs());

        let event = TaskCreatedEvent {
            creator: Address::ZERO,
            task_id,
            avs,
            executor_operator_set_id: self.config.operator_set_id,
            refund_collector: Address::ZERO,
            avs_fee: 0,
            task_deadline: (now + SIMULATED_TASK_TTL).as_secs(),
            payload: Bytes::from(payload.into_bytes()),
        };

        LogWithBlock {
            log: DecodedLog {
                address: self.config.mailbox,
                log_index: Some(log_index),
                transaction_hash: None,
                event: ChainEvent::TaskCreated(event),
            },
            block: block.clone(),
        }
    }
}

fn synthetic_block(chain_id: ChainId, number: u64, timestamp: u64) -> EthBlock {
    EthBlock {
        chain_id,
        number,
        hash: keccak256(U256::from(number).to_be_bytes::<32>()),
        parent_hash: if number == 0 {
            B256::ZERO
        } else {
            keccak256(U256::from(number - 1).to_be_bytes::<32>())
        },
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    const CHAIN: ChainId = ChainId::ETHEREUM_ANVIL;

    fn config(interval: Duration, avs: Vec<Address>) -> SimulatedTaskConfig {
        SimulatedTaskConfig {
            task_interval: interval,
            avs_addresses: avs,
            mailbox: Address::repeat_byte(0xee),
            operator_set_id: 0,
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let (event_tx, _event_rx) = mpsc::channel(1);
        let manual = ManualPushPoller::new(CHAIN, event_tx);
        let err = SimulatedPoller::new(manual, config(Duration::ZERO, vec![])).unwrap_err();
        assert!(matches!(err, PollerError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_generates_task_per_avs() {
        let avs = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let manual = ManualPushPoller::new(CHAIN, event_tx);
        let poller =
            SimulatedPoller::new(manual, config(Duration::from_millis(10), avs.clone())).unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(poller.generate_periodic_tasks(cancel.clone()));

        let mut seen = Vec::new();
        for _ in 0..2 {
            let event = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(event.log.address, Address::repeat_byte(0xee));
            assert_eq!(event.block.chain_id, CHAIN);
            let ChainEvent::TaskCreated(task) = event.log.event else {
                panic!("expected a task");
            };
            assert!(!task.task_id.is_zero());
            assert!(task.task_deadline > event.block.timestamp);
            assert!(task.payload.starts_with(br#"{"type":"periodic""#));
            seen.push(task.avs);
        }
        assert_eq!(seen, avs);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_synthetic_blocks_chain_together() {
        let first = synthetic_block(CHAIN, 1, 0);
        let second = synthetic_block(CHAIN, 2, 0);
        assert_eq!(second.parent_hash, first.hash);
    }
}
