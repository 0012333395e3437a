use alloy_primitives::Address;
use cohort_crypto::CryptoError;
use cohort_primitives::TaskId;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// Aggregators are keyed by task; the zero id is never valid.
    #[error("task id must not be empty")]
    InvalidTaskId,

    #[error("operator set must not be empty")]
    NoOperatorAddresses,

    #[error("threshold percentage must be between 1 and 100, got {0}")]
    InvalidThreshold(u8),

    #[error("result is for task {got}, aggregator serves {expected}")]
    TaskIdMismatch { expected: TaskId, got: TaskId },

    #[error("operator {0} is not a member of the task's operator set")]
    OperatorNotInSet(Address),

    #[error("signature from operator {0} is empty")]
    EmptySignature(Address),

    #[error("operator {0} already submitted a result")]
    DuplicateSubmission(Address),

    #[error("malformed signature from operator {operator}: {source}")]
    MalformedSignature {
        operator: Address,
        #[source]
        source: CryptoError,
    },

    #[error("signature from operator {0} does not verify against its public key")]
    VerificationFailed(Address),

    #[error("signing threshold not met: {signers} of {required} required signers")]
    ThresholdNotMet { signers: usize, required: usize },
}

impl AggregationError {
    /// True for rejections of an individual submission. These leave the accumulator untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AggregationError::TaskIdMismatch { .. }
                | AggregationError::OperatorNotInSet(_)
                | AggregationError::EmptySignature(_)
                | AggregationError::DuplicateSubmission(_)
                | AggregationError::MalformedSignature { .. }
                | AggregationError::VerificationFailed(_)
        )
    }
}
