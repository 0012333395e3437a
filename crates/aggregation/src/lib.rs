//! Threshold aggregation of operator BLS signatures into task certificates.

mod aggregator;
mod certificate;
mod errors;
#[cfg(test)]
pub(crate) mod test_utils;

pub use aggregator::{
    required_signers, AggregatedOperators, ReceivedResponseWithDigest, TaskResultAggregator,
};
pub use certificate::AggregatedCertificate;
pub use errors::AggregationError;
