use alloy_primitives::Address;
use async_trait::async_trait;
use cohort_primitives::OperatorPeerInfo;

use crate::errors::PeeringError;

/// Source of network and key material for an AVS's operators.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait PeeringDataFetcher: Send + Sync + 'static {
    async fn list_executor_operators(
        &self,
        avs_address: Address,
    ) -> Result<Vec<OperatorPeerInfo>, PeeringError>;

    async fn list_aggregator_operators(
        &self,
        avs_address: Address,
    ) -> Result<Vec<OperatorPeerInfo>, PeeringError>;
}

/// Peering data fixed at startup, usually from the config file.
///
/// The same peers are returned for every AVS.
#[derive(Clone, Debug, Default)]
pub struct LocalPeeringDataFetcher {
    executor_peers: Vec<OperatorPeerInfo>,
    aggregator_peers: Vec<OperatorPeerInfo>,
}

impl LocalPeeringDataFetcher {
    pub fn new(
        executor_peers: Vec<OperatorPeerInfo>,
        aggregator_peers: Vec<OperatorPeerInfo>,
    ) -> Self {
        Self {
            executor_peers,
            aggregator_peers,
        }
    }
}

#[async_trait]
impl PeeringDataFetcher for LocalPeeringDataFetcher {
    async fn list_executor_operators(
        &self,
        _avs_address: Address,
    ) -> Result<Vec<OperatorPeerInfo>, PeeringError> {
        Ok(self.executor_peers.clone())
    }

    async fn list_aggregator_operators(
        &self,
        _avs_address: Address,
    ) -> Result<Vec<OperatorPeerInfo>, PeeringError> {
        Ok(self.aggregator_peers.clone())
    }
}

#[cfg(test)]
mod tests {
    use cohort_primitives::test_utils::make_peer;

    use super::*;

    #[tokio::test]
    async fn test_local_fetcher_returns_configured_peers() {
        let fetcher =
            LocalPeeringDataFetcher::new(vec![make_peer(1, &[1]), make_peer(2, &[1, 2])], vec![]);

        let executors = fetcher
            .list_executor_operators(Address::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(executors.len(), 2);
        assert!(executors[1].is_member_of(2));

        let aggregators = fetcher
            .list_aggregator_operators(Address::repeat_byte(1))
            .await
            .unwrap();
        assert!(aggregators.is_empty());
    }
}
