use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use alloy_primitives::{keccak256, Address, B256};
use async_trait::async_trait;
use cohort_aggregation::AggregatedCertificate;
use cohort_primitives::{ChainId, OperatorPeerInfo, OperatorSetId};
use parking_lot::Mutex;
use tracing::info;

use crate::{errors::ContractCallerError, peering::PeeringDataFetcher};

/// Outcome of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Writes certificates to, and reads operator sets from, one chain.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ContractCaller: Send + Sync + 'static {
    async fn submit_task_result(
        &self,
        certificate: &AggregatedCertificate,
    ) -> Result<TxReceipt, ContractCallerError>;

    /// Current members of an operator set along with their peering data.
    async fn get_operator_set_members_with_peering(
        &self,
        avs_address: Address,
        operator_set_id: OperatorSetId,
    ) -> Result<Vec<OperatorPeerInfo>, ContractCallerError>;
}

/// Certificates a [`SimulatedContractCaller`] keeps by default.
pub const DEFAULT_SUBMISSION_HISTORY: usize = 64;

/// Caller for simulated chains: certificates are checked and the most recent ones kept in
/// memory, membership is answered from peering data.
pub struct SimulatedContractCaller {
    chain_id: ChainId,
    peering: Arc<dyn PeeringDataFetcher>,
    submitted: Mutex<VecDeque<AggregatedCertificate>>,
    history_limit: usize,
    nonce: AtomicU64,
}

impl fmt::Debug for SimulatedContractCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedContractCaller")
            .field("chain_id", &self.chain_id)
            .field("submitted", &self.submitted_count())
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl SimulatedContractCaller {
    pub fn new(chain_id: ChainId, peering: Arc<dyn PeeringDataFetcher>) -> Self {
        Self {
            chain_id,
            peering,
            submitted: Mutex::new(VecDeque::new()),
            history_limit: DEFAULT_SUBMISSION_HISTORY,
            nonce: AtomicU64::new(0),
        }
    }

    /// Caps how many accepted certificates are kept; older ones are dropped first.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Most recently accepted certificates, oldest first.
    pub fn submitted(&self) -> Vec<AggregatedCertificate> {
        self.submitted.lock().iter().cloned().collect()
    }

    /// Certificates accepted since creation, including ones no longer kept.
    pub fn submitted_count(&self) -> u64 {
        self.nonce.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ContractCaller for SimulatedContractCaller {
    async fn submit_task_result(
        &self,
        certificate: &AggregatedCertificate,
    ) -> Result<TxReceipt, ContractCallerError> {
        if !certificate.verify() {
            return Err(ContractCallerError::Reverted(format!(
                "invalid certificate signature for task {}",
                certificate.task_id
            )));
        }

        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let mut preimage = certificate.task_id.as_slice().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let transaction_hash = keccak256(preimage);

        {
            let mut submitted = self.submitted.lock();
            if submitted.len() >= self.history_limit {
                submitted.pop_front();
            }
            submitted.push_back(certificate.clone());
        }
        info!(
            chain_id = %self.chain_id,
            task_id = %certificate.task_id,
            tx_hash = %transaction_hash,
            signers = certificate.signer_operators.len(),
            "recorded simulated certificate submission"
        );

        Ok(TxReceipt {
            transaction_hash,
            block_number: None,
            success: true,
        })
    }

    async fn get_operator_set_members_with_peering(
        &self,
        avs_address: Address,
        operator_set_id: OperatorSetId,
    ) -> Result<Vec<OperatorPeerInfo>, ContractCallerError> {
        let peers = self
            .peering
            .list_executor_operators(avs_address)
            .await
            .map_err(|e| ContractCallerError::Rpc(e.to_string()))?;
        Ok(peers
            .into_iter()
            .filter(|p| p.is_member_of(operator_set_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use cohort_primitives::test_utils::make_peer;

    use super::*;
    use crate::{peering::LocalPeeringDataFetcher, test_utils::make_certificate};

    fn make_caller() -> SimulatedContractCaller {
        let peering =
            LocalPeeringDataFetcher::new(vec![make_peer(0, &[1]), make_peer(1, &[2])], vec![]);
        SimulatedContractCaller::new(ChainId::ETHEREUM_ANVIL, Arc::new(peering))
    }

    #[tokio::test]
    async fn test_submission_recorded_with_distinct_hashes() {
        let caller = make_caller();
        let cert = make_certificate(3);

        let first = caller.submit_task_result(&cert).await.unwrap();
        let second = caller.submit_task_result(&cert).await.unwrap();

        assert!(first.success);
        assert_ne!(first.transaction_hash, second.transaction_hash);
        assert_eq!(caller.submitted().len(), 2);
    }

    #[tokio::test]
    async fn test_history_keeps_most_recent() {
        // Scenario: five certificates accepted with room for two.
        // Expected: only the last two are kept, the count covers all five.
        let caller = make_caller().with_history_limit(2);
        let certs: Vec<_> = (1..=5).map(make_certificate).collect();
        for cert in &certs {
            caller.submit_task_result(cert).await.unwrap();
        }

        let kept = caller.submitted();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].signer_operators.len(), 4);
        assert_eq!(kept[1].signer_operators.len(), 5);
        assert_eq!(caller.submitted_count(), 5);
    }

    #[tokio::test]
    async fn test_tampered_certificate_reverts() {
        let caller = make_caller();
        let mut cert = make_certificate(3);
        cert.task_response_digest = B256::repeat_byte(0xff);

        let err = caller.submit_task_result(&cert).await.unwrap_err();
        assert!(matches!(err, ContractCallerError::Reverted(_)));
        assert!(caller.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_members_filtered_by_set() {
        let caller = make_caller();
        let members = caller
            .get_operator_set_members_with_peering(Address::repeat_byte(1), 2)
            .await
            .unwrap();
        assert_eq!(members, vec![make_peer(1, &[2])]);
    }
}
