//! Identifiers.

use std::{fmt, str::FromStr};

use alloy_primitives::{hex::FromHexError, B256};
use serde::{Deserialize, Serialize};

/// Operator set index within an AVS.
pub type OperatorSetId = u32;

/// Globally unique task identifier, the task hash emitted by the mailbox contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(B256);

impl TaskId {
    pub const fn new(hash: B256) -> Self {
        Self(hash)
    }

    pub fn as_b256(&self) -> &B256 {
        &self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// The all-zero id is never emitted by the mailbox and is treated as unset.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<B256> for TaskId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl FromStr for TaskId {
    type Err = FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s).map(Self)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// EVM chain id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub const ETHEREUM_MAINNET: ChainId = ChainId(1);
    pub const ETHEREUM_HOLESKY: ChainId = ChainId(17000);
    pub const ETHEREUM_HOODI: ChainId = ChainId(560048);
    pub const ETHEREUM_ANVIL: ChainId = ChainId(31337);

    /// Chains the aggregator knows how to serve.
    pub const SUPPORTED: [ChainId; 4] = [
        Self::ETHEREUM_MAINNET,
        Self::ETHEREUM_HOLESKY,
        Self::ETHEREUM_HOODI,
        Self::ETHEREUM_ANVIL,
    ];

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_parse_and_display() {
        let s = "0x00000000000000000000000000000000000000000000000000000000000000ab";
        let id: TaskId = s.parse().unwrap();
        assert_eq!(id.to_string(), s);
        assert!(!id.is_zero());
        assert!(TaskId::new(B256::ZERO).is_zero());
    }

    #[test]
    fn test_task_id_serde_is_transparent_hex() {
        let id = TaskId::new(B256::repeat_byte(0x11));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", B256::repeat_byte(0x11)));
    }

    #[test]
    fn test_supported_chains() {
        assert!(ChainId::new(1).is_supported());
        assert!(ChainId::new(31337).is_supported());
        assert!(!ChainId::new(10).is_supported());
    }
}
