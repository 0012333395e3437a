use std::{
    collections::{BTreeSet, HashMap},
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, Bytes, B256};
use cohort_crypto::{PublicKey, Signature};
use cohort_primitives::{OperatorPeerInfo, OperatorSetId, TaskId, TaskResult};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{certificate::AggregatedCertificate, errors::AggregationError};

/// Number of signers needed to reach `threshold_percentage` of `operator_count`.
///
/// Rounds up, and never asks for fewer than one signer.
pub fn required_signers(threshold_percentage: u8, operator_count: usize) -> usize {
    (threshold_percentage as usize * operator_count)
        .div_ceil(100)
        .max(1)
}

/// A verified submission kept for certificate assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedResponseWithDigest {
    pub task_result: TaskResult,
    pub signature: Signature,
    pub digest: B256,
}

/// Running aggregate over the signers that attested to one output digest.
#[derive(Clone, Debug)]
pub struct AggregatedOperators {
    pub aggregate_public_key: PublicKey,
    pub aggregate_signature: Signature,
    pub signers: BTreeSet<Address>,
    pub total_signers: usize,
    pub last_received_response: ReceivedResponseWithDigest,
    /// Arrival sequence of the group's first signature, used to break ties.
    first_seen: u64,
}

impl AggregatedOperators {
    fn new(response: ReceivedResponseWithDigest, public_key: PublicKey, seq: u64) -> Self {
        let mut signers = BTreeSet::new();
        signers.insert(response.task_result.operator_address);
        Self {
            aggregate_public_key: public_key,
            aggregate_signature: response.signature,
            signers,
            total_signers: 1,
            last_received_response: response,
            first_seen: seq,
        }
    }

    fn add(&mut self, response: ReceivedResponseWithDigest, public_key: PublicKey) {
        self.aggregate_public_key = self.aggregate_public_key + public_key;
        self.aggregate_signature = self.aggregate_signature + response.signature;
        self.signers.insert(response.task_result.operator_address);
        self.total_signers += 1;
        self.last_received_response = response;
    }
}

#[derive(Debug, Default)]
struct AggregationState {
    received: HashMap<Address, ReceivedResponseWithDigest>,
    /// Signers partitioned by the digest of the output they signed.
    groups: HashMap<B256, AggregatedOperators>,
    next_seq: u64,
    threshold_met: bool,
}

impl AggregationState {
    /// Largest agreeing group; ties go to the group that started first.
    fn leading_group(&self) -> Option<&AggregatedOperators> {
        self.groups.values().max_by(|a, b| {
            a.total_signers
                .cmp(&b.total_signers)
                .then_with(|| b.first_seen.cmp(&a.first_seen))
        })
    }

    fn leading_count(&self) -> usize {
        self.leading_group().map(|g| g.total_signers).unwrap_or(0)
    }
}

/// Collects operator signatures for a single task until a signing threshold is reached.
///
/// Submissions are verified against `keccak256(output)` and the submitting operator's key,
/// then folded into an accumulator for the digest they signed. The threshold is evaluated on
/// the largest group of operators that agree byte-for-byte on the output, and the final
/// certificate only aggregates that group.
#[derive(Debug)]
pub struct TaskResultAggregator {
    task_id: TaskId,
    task_created_block: u64,
    operator_set_id: OperatorSetId,
    threshold_percentage: u8,
    payload: Bytes,
    deadline_unix_seconds: u64,
    operators: Vec<OperatorPeerInfo>,
    operator_keys: HashMap<Address, PublicKey>,
    required: usize,
    state: Mutex<AggregationState>,
}

impl TaskResultAggregator {
    pub fn new(
        task_id: TaskId,
        task_created_block: u64,
        operator_set_id: OperatorSetId,
        threshold_percentage: u8,
        payload: Bytes,
        deadline_unix_seconds: u64,
        operators: Vec<OperatorPeerInfo>,
    ) -> Result<Self, AggregationError> {
        if task_id.is_zero() {
            return Err(AggregationError::InvalidTaskId);
        }
        if operators.is_empty() {
            return Err(AggregationError::NoOperatorAddresses);
        }
        if threshold_percentage == 0 || threshold_percentage > 100 {
            return Err(AggregationError::InvalidThreshold(threshold_percentage));
        }

        let operator_keys = operators
            .iter()
            .map(|op| (op.operator_address, op.public_key))
            .collect();
        let required = required_signers(threshold_percentage, operators.len());

        Ok(Self {
            task_id,
            task_created_block,
            operator_set_id,
            threshold_percentage,
            payload,
            deadline_unix_seconds,
            operators,
            operator_keys,
            required,
            state: Mutex::new(AggregationState::default()),
        })
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn task_created_block(&self) -> u64 {
        self.task_created_block
    }

    pub fn operator_set_id(&self) -> OperatorSetId {
        self.operator_set_id
    }

    pub fn threshold_percentage(&self) -> u8 {
        self.threshold_percentage
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn deadline_unix_seconds(&self) -> u64 {
        self.deadline_unix_seconds
    }

    pub fn operators(&self) -> &[OperatorPeerInfo] {
        &self.operators
    }

    pub fn required_signers(&self) -> usize {
        self.required
    }

    /// Total verified submissions across all output groups.
    pub fn signer_count(&self) -> usize {
        self.state.lock().received.len()
    }

    /// Size of the largest group of signers agreeing on one output.
    pub fn leading_signer_count(&self) -> usize {
        self.state.lock().leading_count()
    }

    /// Validates and folds in one operator's result.
    ///
    /// Nothing is recorded unless every check passes.
    pub fn process_new_signature(&self, result: &TaskResult) -> Result<(), AggregationError> {
        let operator = result.operator_address;

        if result.task_id != self.task_id {
            return Err(AggregationError::TaskIdMismatch {
                expected: self.task_id,
                got: result.task_id,
            });
        }

        let public_key = *self
            .operator_keys
            .get(&operator)
            .ok_or(AggregationError::OperatorNotInSet(operator))?;

        if result.signature.is_empty() {
            return Err(AggregationError::EmptySignature(operator));
        }

        if self.state.lock().received.contains_key(&operator) {
            return Err(AggregationError::DuplicateSubmission(operator));
        }

        // Pairings are slow, keep them outside the lock.
        let signature = Signature::from_bytes(&result.signature)
            .map_err(|source| AggregationError::MalformedSignature { operator, source })?;
        let digest = result.digest();
        if !public_key.verify(digest.as_slice(), &signature) {
            return Err(AggregationError::VerificationFailed(operator));
        }

        let response = ReceivedResponseWithDigest {
            task_result: result.clone(),
            signature,
            digest,
        };

        let mut state = self.state.lock();
        // Another submission from the same operator may have landed while verifying.
        if state.received.contains_key(&operator) {
            return Err(AggregationError::DuplicateSubmission(operator));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.received.insert(operator, response.clone());
        match state.groups.get_mut(&digest) {
            Some(group) => group.add(response, public_key),
            None => {
                state
                    .groups
                    .insert(digest, AggregatedOperators::new(response, public_key, seq));
            }
        }

        let leading = state.leading_count();
        if !state.threshold_met && leading >= self.required {
            state.threshold_met = true;
            info!(task_id = %self.task_id, signers = leading, required = self.required, "signing threshold met");
        } else {
            debug!(task_id = %self.task_id, %operator, %digest, leading, required = self.required, "recorded signature");
        }

        Ok(())
    }

    /// Whether enough operators agree on one output. Once true, stays true.
    pub fn signing_threshold_met(&self) -> bool {
        self.state.lock().threshold_met
    }

    /// Assembles the certificate from the leading output group.
    ///
    /// Every operator in the task snapshot lands in exactly one of the signer and non-signer
    /// lists; operators who signed a different output count as non-signers.
    pub fn generate_final_certificate(&self) -> Result<AggregatedCertificate, AggregationError> {
        let state = self.state.lock();
        let signers = state.leading_count();
        if !state.threshold_met {
            return Err(AggregationError::ThresholdNotMet {
                signers,
                required: self.required,
            });
        }
        let group = state.leading_group().ok_or(AggregationError::ThresholdNotMet {
            signers,
            required: self.required,
        })?;

        let mut signer_operators = Vec::new();
        let mut signers_pub_keys = Vec::new();
        let mut non_signer_operators = Vec::new();
        let mut non_signers_pub_keys = Vec::new();
        for op in &self.operators {
            if group.signers.contains(&op.operator_address) {
                signer_operators.push(op.operator_address);
                signers_pub_keys.push(op.public_key);
            } else {
                non_signer_operators.push(op.operator_address);
                non_signers_pub_keys.push(op.public_key);
            }
        }

        let response = &group.last_received_response;
        Ok(AggregatedCertificate {
            task_id: self.task_id,
            task_response: response.task_result.output.clone(),
            task_response_digest: response.digest,
            signer_operators,
            signers_pub_keys,
            non_signer_operators,
            non_signers_pub_keys,
            all_operators_pub_keys: self.operators.iter().map(|op| op.public_key).collect(),
            signers_signature: group.aggregate_signature,
            signers_public_key: group.aggregate_public_key,
            signed_at: unix_now(),
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
