//! Data types shared by the chain poller, execution manager and aggregation layers.

pub mod block;
pub mod contracts;
pub mod events;
pub mod ids;
pub mod operator;
pub mod task;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use block::EthBlock;
pub use contracts::{core_contracts, CoreContracts};
pub use events::{
    ChainEvent, DecodeError, DecodedLog, LogWithBlock, OperatorSetMembershipEvent,
    TaskCreatedEvent,
};
pub use ids::{ChainId, OperatorSetId, TaskId};
pub use operator::OperatorPeerInfo;
pub use task::{output_digest, Task, TaskResult};
