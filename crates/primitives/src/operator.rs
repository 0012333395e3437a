//! Operator peering records.

use alloy_primitives::Address;
use cohort_crypto::PublicKey;
use serde::{Deserialize, Serialize};

use crate::OperatorSetId;

/// How to reach an operator and which key its signatures verify against.
///
/// All fields are owned, so `clone()` is a deep copy. Task snapshots rely on this: a record
/// cloned into a task is unaffected by later membership changes on the source table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPeerInfo {
    pub operator_address: Address,
    /// Host and port of the operator's RPC endpoint.
    pub network_address: String,
    pub public_key: PublicKey,
    pub operator_set_ids: Vec<OperatorSetId>,
}

impl OperatorPeerInfo {
    pub fn is_member_of(&self, operator_set_id: OperatorSetId) -> bool {
        self.operator_set_ids.contains(&operator_set_id)
    }

    /// Records membership in `operator_set_id`. Returns false if it was already present.
    pub fn add_operator_set(&mut self, operator_set_id: OperatorSetId) -> bool {
        if self.is_member_of(operator_set_id) {
            return false;
        }
        self.operator_set_ids.push(operator_set_id);
        true
    }

    /// Drops membership in `operator_set_id`. Returns false if it was not present.
    pub fn remove_operator_set(&mut self, operator_set_id: OperatorSetId) -> bool {
        let before = self.operator_set_ids.len();
        self.operator_set_ids.retain(|id| *id != operator_set_id);
        self.operator_set_ids.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_peer;

    #[test]
    fn test_membership_edits() {
        let mut peer = make_peer(1, &[1]);
        assert!(peer.is_member_of(1));
        assert!(!peer.add_operator_set(1));
        assert!(peer.add_operator_set(2));
        assert_eq!(peer.operator_set_ids, vec![1, 2]);
        assert!(peer.remove_operator_set(1));
        assert!(!peer.remove_operator_set(1));
        assert_eq!(peer.operator_set_ids, vec![2]);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = make_peer(1, &[7]);
        let snapshot = original.clone();
        original.add_operator_set(8);
        original.network_address.push_str(":changed");

        assert_eq!(snapshot.operator_set_ids, vec![7]);
        assert_ne!(snapshot.network_address, original.network_address);
    }
}
