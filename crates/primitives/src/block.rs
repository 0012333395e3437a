use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::ChainId;

/// Header fields of an observed block, tagged with the chain it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthBlock {
    pub chain_id: ChainId,
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
}
