//! Well-known core contract deployments.

use alloy_primitives::{address, Address};

use crate::ChainId;

const MAINNET_ALLOCATION_MANAGER: Address = address!("948a420b8cc1d6bfd0b6087c2e7c344a2cd0bc39");
const MAINNET_TASK_MAILBOX: Address = address!("7306a649b451ae08781108445425bd4e8acf1e00");
const HOLESKY_ALLOCATION_MANAGER: Address = address!("78469728304326cbc65f8f95fa756b0b73164462");

/// Core contracts whose logs drive task and membership events on a chain.
///
/// Either address may be absent on chains where that contract has no canonical deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreContracts {
    pub allocation_manager: Option<Address>,
    pub task_mailbox: Option<Address>,
}

impl CoreContracts {
    /// Deployed addresses, skipping the ones that are absent.
    pub fn addresses(&self) -> impl Iterator<Item = Address> {
        [self.allocation_manager, self.task_mailbox]
            .into_iter()
            .flatten()
    }
}

/// Returns the core contracts for a supported chain.
pub fn core_contracts(chain_id: ChainId) -> Option<CoreContracts> {
    match chain_id {
        ChainId::ETHEREUM_MAINNET | ChainId::ETHEREUM_ANVIL => Some(CoreContracts {
            allocation_manager: Some(MAINNET_ALLOCATION_MANAGER),
            task_mailbox: Some(MAINNET_TASK_MAILBOX),
        }),
        ChainId::ETHEREUM_HOLESKY => Some(CoreContracts {
            allocation_manager: Some(HOLESKY_ALLOCATION_MANAGER),
            task_mailbox: None,
        }),
        ChainId::ETHEREUM_HOODI => Some(CoreContracts {
            allocation_manager: None,
            task_mailbox: None,
        }),
        _ => None,
    }
}
