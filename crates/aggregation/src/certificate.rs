use alloy_primitives::{Address, Bytes, B256};
use cohort_crypto::{PublicKey, Signature};
use cohort_primitives::TaskId;
use serde::{Deserialize, Serialize};

/// Proof that a quorum of a task's operators signed the same output.
///
/// Built once when the signing threshold is crossed and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedCertificate {
    pub task_id: TaskId,
    /// Output every signer in this certificate attested to.
    pub task_response: Bytes,
    pub task_response_digest: B256,
    pub signer_operators: Vec<Address>,
    pub signers_pub_keys: Vec<PublicKey>,
    pub non_signer_operators: Vec<Address>,
    pub non_signers_pub_keys: Vec<PublicKey>,
    pub all_operators_pub_keys: Vec<PublicKey>,
    pub signers_signature: Signature,
    pub signers_public_key: PublicKey,
    /// Unix seconds.
    pub signed_at: u64,
}

impl AggregatedCertificate {
    /// Checks the aggregate signature against the aggregate key over the response digest.
    pub fn verify(&self) -> bool {
        self.signers_public_key
            .verify(self.task_response_digest.as_slice(), &self.signers_signature)
    }
}
