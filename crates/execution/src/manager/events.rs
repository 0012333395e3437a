use alloy_primitives::Address;
use cohort_primitives::{
    ChainEvent, ChainId, LogWithBlock, OperatorSetMembershipEvent, Task, TaskCreatedEvent, TaskId,
};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, trace, warn};

use super::{ctx::ExecutionManagerCtx, ManagerState};
use crate::errors::{ExecutionError, Result};

/// What a chain event changed.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum EventAction {
    Ignored,
    TaskQueued(TaskId),
    PeerUpdated(Address),
}

pub(crate) async fn handle_chain_event(
    state: &mut ManagerState,
    ctx: &ExecutionManagerCtx,
    event: LogWithBlock,
) -> Result<EventAction> {
    let LogWithBlock { log, block } = event;

    if !ctx.watched_contracts.contains(&log.address) {
        trace!(address = %log.address, "ignoring log from unwatched contract");
        return Ok(EventAction::Ignored);
    }
    if !ctx.config.supported_chains.contains(&block.chain_id) {
        trace!(chain_id = %block.chain_id, "ignoring log from unsupported chain");
        return Ok(EventAction::Ignored);
    }

    match &log.event {
        ChainEvent::TaskCreated(created) => {
            let task = Task::from_event(created, log.address, &block);
            process_task(state, ctx, created, task)
        }
        ChainEvent::OperatorAddedToOperatorSet(membership) => {
            process_operator_added(state, ctx, membership, block.chain_id).await
        }
        ChainEvent::OperatorRemovedFromOperatorSet(membership) => {
            process_operator_removed(state, ctx, membership)
        }
        ChainEvent::Unrecognized { topic0 } => {
            trace!(address = %log.address, ?topic0, "ignoring unrecognized log");
            Ok(EventAction::Ignored)
        }
    }
}

fn process_task(
    state: &ManagerState,
    ctx: &ExecutionManagerCtx,
    created: &TaskCreatedEvent,
    task: Task,
) -> Result<EventAction> {
    if created.avs != ctx.config.avs_address {
        debug!(task_avs = %created.avs, avs = %ctx.config.avs_address, "ignoring task for different avs");
        return Ok(EventAction::Ignored);
    }

    let task = task.with_recipients(state.operator_peers.values());
    let task_id = task.task_id;
    info!(
        %task_id,
        operator_set_id = task.operator_set_id,
        recipients = task.recipient_operators.len(),
        block = task.block_number,
        "received task"
    );

    ctx.task_tx.try_send(task).map_err(|e| match e {
        TrySendError::Full(_) => ExecutionError::QueueFull("task"),
        TrySendError::Closed(_) => ExecutionError::ManagerStopped,
    })?;
    Ok(EventAction::TaskQueued(task_id))
}

async fn process_operator_added(
    state: &mut ManagerState,
    ctx: &ExecutionManagerCtx,
    membership: &OperatorSetMembershipEvent,
    chain_id: ChainId,
) -> Result<EventAction> {
    let OperatorSetMembershipEvent {
        operator,
        avs,
        operator_set_id,
    } = *membership;
    if avs != ctx.config.avs_address {
        return Ok(EventAction::Ignored);
    }

    if let Some(peer) = state.operator_peers.get_mut(&operator) {
        if peer.add_operator_set(operator_set_id) {
            info!(%operator, %operator_set_id, "operator joined operator set");
        }
        return Ok(EventAction::PeerUpdated(operator));
    }

    // unknown operator, its peering data has to come from the chain
    let caller = ctx
        .contract_caller(chain_id)
        .ok_or(ExecutionError::MissingContractCaller(chain_id))?;
    let members = caller
        .get_operator_set_members_with_peering(avs, operator_set_id)
        .await?;

    match members.into_iter().find(|p| p.operator_address == operator) {
        Some(mut peer) => {
            peer.add_operator_set(operator_set_id);
            info!(%operator, %operator_set_id, network_address = %peer.network_address, "added new operator peer");
            state.operator_peers.insert(operator, peer);
            Ok(EventAction::PeerUpdated(operator))
        }
        None => {
            warn!(%operator, %operator_set_id, "no peering data for new operator");
            Ok(EventAction::Ignored)
        }
    }
}

fn process_operator_removed(
    state: &mut ManagerState,
    ctx: &ExecutionManagerCtx,
    membership: &OperatorSetMembershipEvent,
) -> Result<EventAction> {
    let OperatorSetMembershipEvent {
        operator,
        avs,
        operator_set_id,
    } = *membership;
    if avs != ctx.config.avs_address {
        return Ok(EventAction::Ignored);
    }

    let peer = state
        .operator_peers
        .get_mut(&operator)
        .ok_or(ExecutionError::UnknownPeer(operator))?;
    if peer.remove_operator_set(operator_set_id) {
        info!(%operator, %operator_set_id, "operator left operator set");
    }
    Ok(EventAction::PeerUpdated(operator))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use cohort_primitives::{
        core_contracts,
        test_utils::{make_block, make_peer},
        DecodedLog,
    };

    use super::*;
    use crate::{
        contract_caller::MockContractCaller,
        errors::ContractCallerError,
        manager::test_utils::{make_ctx, CtxParts},
        test_utils::{avs, now_unix},
    };

    const CHAIN: ChainId = ChainId::ETHEREUM_ANVIL;

    fn mailbox() -> Address {
        Address::repeat_byte(0xee)
    }

    fn allocation_manager() -> Address {
        core_contracts(CHAIN).unwrap().allocation_manager.unwrap()
    }

    fn event(address: Address, chain_id: ChainId, event: ChainEvent) -> LogWithBlock {
        LogWithBlock {
            log: DecodedLog {
                address,
                log_index: Some(0),
                transaction_hash: None,
                event,
            },
            block: make_block(chain_id, 42),
        }
    }

    fn task_created(avs: Address, operator_set_id: u32) -> ChainEvent {
        ChainEvent::TaskCreated(TaskCreatedEvent {
            creator: Address::repeat_byte(0xcc),
            task_id: TaskId::new(B256::repeat_byte(0x42)),
            avs,
            executor_operator_set_id: operator_set_id,
            refund_collector: Address::ZERO,
            avs_fee: 0,
            task_deadline: now_unix() + 60,
            payload: b"payload".into(),
        })
    }

    fn added(operator: Address, avs: Address, operator_set_id: u32) -> ChainEvent {
        ChainEvent::OperatorAddedToOperatorSet(OperatorSetMembershipEvent {
            operator,
            avs,
            operator_set_id,
        })
    }

    fn removed(operator: Address, avs: Address, operator_set_id: u32) -> ChainEvent {
        ChainEvent::OperatorRemovedFromOperatorSet(OperatorSetMembershipEvent {
            operator,
            avs,
            operator_set_id,
        })
    }

    mod task_created {
        use super::*;

        #[tokio::test]
        async fn test_task_snapshot_filters_by_operator_set() {
            // Scenario: peers 0 and 1 in set 1, peer 2 in set 2; task for set 1.
            // Expected: task queued with peers 0 and 1 only.
            let CtxParts { ctx, mut task_rx, .. } = make_ctx(MockContractCaller::new());
            let mut state = ManagerState::new(vec![
                make_peer(0, &[1]),
                make_peer(1, &[1, 2]),
                make_peer(2, &[2]),
            ]);

            let action = handle_chain_event(&mut state, &ctx, event(mailbox(), CHAIN, task_created(avs(), 1)))
                .await
                .unwrap();
            assert_eq!(action, EventAction::TaskQueued(TaskId::new(B256::repeat_byte(0x42))));

            let task = task_rx.try_recv().unwrap();
            let mut recipients: Vec<_> = task.recipient_operators.iter().map(|p| p.operator_address).collect();
            recipients.sort();
            let mut expected = vec![make_peer(0, &[]).operator_address, make_peer(1, &[]).operator_address];
            expected.sort();
            assert_eq!(recipients, expected);
            assert_eq!(task.mailbox_address, mailbox());
            assert_eq!(task.block_number, 42);
        }

        #[tokio::test]
        async fn test_snapshot_does_not_alias_peer_table() {
            let CtxParts { ctx, mut task_rx, .. } = make_ctx(MockContractCaller::new());
            let mut state = ManagerState::new(vec![make_peer(0, &[1])]);

            handle_chain_event(&mut state, &ctx, event(mailbox(), CHAIN, task_created(avs(), 1)))
                .await
                .unwrap();
            let operator = make_peer(0, &[]).operator_address;
            handle_chain_event(&mut state, &ctx, event(allocation_manager(), CHAIN, removed(operator, avs(), 1)))
                .await
                .unwrap();

            let task = task_rx.try_recv().unwrap();
            assert!(task.recipient_operators[0].is_member_of(1));
            assert!(!state.operator_peers[&operator].is_member_of(1));
        }

        #[tokio::test]
        async fn test_unwatched_contract_is_noop() {
            let CtxParts { ctx, mut task_rx, .. } = make_ctx(MockContractCaller::new());
            let mut state = ManagerState::new(vec![make_peer(0, &[1])]);

            let action = handle_chain_event(
                &mut state,
                &ctx,
                event(Address::repeat_byte(0x99), CHAIN, task_created(avs(), 1)),
            )
            .await
            .unwrap();
            assert_eq!(action, EventAction::Ignored);
            assert!(task_rx.try_recv().is_err());
        }

        #[tokio::test]
        async fn test_other_avs_and_other_chain_ignored() {
            let CtxParts { ctx, mut task_rx, .. } = make_ctx(MockContractCaller::new());
            let mut state = ManagerState::new(vec![make_peer(0, &[1])]);

            let other_avs = event(mailbox(), CHAIN, task_created(Address::repeat_byte(0x0b), 1));
            let other_chain = event(mailbox(), ChainId::ETHEREUM_MAINNET, task_created(avs(), 1));
            for ev in [other_avs, other_chain] {
                let action = handle_chain_event(&mut state, &ctx, ev).await.unwrap();
                assert_eq!(action, EventAction::Ignored);
            }
            assert!(task_rx.try_recv().is_err());
        }
    }

    mod membership {
        use super::*;

        #[tokio::test]
        async fn test_known_operator_gains_set() {
            let mut caller = MockContractCaller::new();
            caller.expect_get_operator_set_members_with_peering().never();
            let CtxParts { ctx, .. } = make_ctx(caller);
            let mut state = ManagerState::new(vec![make_peer(0, &[1])]);
            let operator = make_peer(0, &[]).operator_address;

            let action = handle_chain_event(&mut state, &ctx, event(allocation_manager(), CHAIN, added(operator, avs(), 7)))
                .await
                .unwrap();
            assert_eq!(action, EventAction::PeerUpdated(operator));
            assert_eq!(state.operator_peers[&operator].operator_set_ids, vec![1, 7]);
        }

        #[tokio::test]
        async fn test_unknown_operator_fetched_from_chain() {
            // Scenario: operator 5 joins set 3 and is not in the peer table.
            // Expected: peering data looked up through the contract caller and inserted.
            let mut caller = MockContractCaller::new();
            caller
                .expect_get_operator_set_members_with_peering()
                .withf(|avs_address, set| *avs_address == avs() && *set == 3)
                .times(1)
                .returning(|_, _| Ok(vec![make_peer(4, &[3]), make_peer(5, &[3])]));
            let CtxParts { ctx, .. } = make_ctx(caller);
            let mut state = ManagerState::new(vec![]);
            let operator = make_peer(5, &[]).operator_address;

            let action = handle_chain_event(&mut state, &ctx, event(allocation_manager(), CHAIN, added(operator, avs(), 3)))
                .await
                .unwrap();
            assert_eq!(action, EventAction::PeerUpdated(operator));
            assert_eq!(state.operator_peers.len(), 1);
            assert!(state.operator_peers[&operator].is_member_of(3));
        }

        #[tokio::test]
        async fn test_lookup_failure_propagates() {
            let mut caller = MockContractCaller::new();
            caller
                .expect_get_operator_set_members_with_peering()
                .returning(|_, _| Err(ContractCallerError::Rpc("timeout".to_string())));
            let CtxParts { ctx, .. } = make_ctx(caller);
            let mut state = ManagerState::new(vec![]);

            let err = handle_chain_event(
                &mut state,
                &ctx,
                event(allocation_manager(), CHAIN, added(Address::repeat_byte(5), avs(), 3)),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ExecutionError::ContractCaller(_)));
            assert!(state.operator_peers.is_empty());
        }

        #[tokio::test]
        async fn test_removal_of_unknown_peer_is_error() {
            let CtxParts { ctx, .. } = make_ctx(MockContractCaller::new());
            let mut state = ManagerState::new(vec![]);
            let operator = Address::repeat_byte(5);

            let err = handle_chain_event(&mut state, &ctx, event(allocation_manager(), CHAIN, removed(operator, avs(), 1)))
                .await
                .unwrap_err();
            assert!(matches!(err, ExecutionError::UnknownPeer(op) if op == operator));
        }

        #[tokio::test]
        async fn test_removal_keeps_other_sets() {
            let CtxParts { ctx, .. } = make_ctx(MockContractCaller::new());
            let mut state = ManagerState::new(vec![make_peer(0, &[1, 2, 3])]);
            let operator = make_peer(0, &[]).operator_address;

            handle_chain_event(&mut state, &ctx, event(allocation_manager(), CHAIN, removed(operator, avs(), 2)))
                .await
                .unwrap();
            assert_eq!(state.operator_peers[&operator].operator_set_ids, vec![1, 3]);
        }
    }
}
