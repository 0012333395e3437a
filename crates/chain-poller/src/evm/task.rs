use cohort_primitives::{DecodedLog, EthBlock, LogWithBlock};
use futures::future::join_all;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::ctx::EvmPollerCtx;
use crate::{
    client::{ChainClient, LogFilter},
    errors::{PollerError, Result},
};

pub(crate) async fn evm_poller_task<C: ChainClient>(
    mut last_observed: Option<u64>,
    ctx: EvmPollerCtx<C>,
    cancel: CancellationToken,
) {
    info!(
        chain_id = %ctx.chain_id,
        contracts = ctx.contracts.len(),
        interval_ms = ctx.poll_interval.as_millis() as u64,
        "starting evm chain poller"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(ctx.poll_interval) => {}
        }

        let res = tokio::select! {
            _ = cancel.cancelled() => break,
            res = poll_tick(&mut last_observed, &ctx) => res,
        };

        match res {
            Ok(action) => trace!(chain_id = %ctx.chain_id, ?action, "poll tick done"),
            Err(err) if err.is_recoverable() => {
                warn!(chain_id = %ctx.chain_id, %err, "poll tick failed, retrying next interval");
            }
            Err(err) => {
                error!(chain_id = %ctx.chain_id, %err, "stopping evm chain poller");
                return;
            }
        }
    }

    info!(chain_id = %ctx.chain_id, "evm chain poller cancelled");
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PollAction {
    /// Nothing was observed before, start right after this block.
    Seed(u64),
    /// Blocks `from..=to` are new.
    Process { from: u64, to: u64 },
    /// Chain tip has not moved past the last observed block.
    Noop,
}

/// Decides what a tick should do given the node's current tip.
pub(crate) async fn check_chain_tip(
    last_observed: Option<u64>,
    client: &impl ChainClient,
) -> Result<PollAction> {
    let latest = client.block_number().await?;

    let Some(last) = last_observed else {
        return Ok(PollAction::Seed(latest.saturating_sub(1)));
    };

    if latest < last {
        warn!(%latest, %last, "chain tip is behind last observed block");
        return Ok(PollAction::Noop);
    }

    if latest == last {
        return Ok(PollAction::Noop);
    }

    Ok(PollAction::Process {
        from: last + 1,
        to: latest,
    })
}

/// Runs one tick. `last_observed` only advances past blocks whose logs were fully handed off.
pub(crate) async fn poll_tick<C: ChainClient>(
    last_observed: &mut Option<u64>,
    ctx: &EvmPollerCtx<C>,
) -> Result<PollAction> {
    let action = check_chain_tip(*last_observed, ctx.client.as_ref()).await?;

    match action {
        PollAction::Seed(block) => {
            debug!(chain_id = %ctx.chain_id, %block, "seeded last observed block");
            *last_observed = Some(block);
            ctx.notify_observed(block);
        }
        PollAction::Process { from, to } => {
            for number in from..=to {
                let forwarded = process_block(number, ctx).await?;
                *last_observed = Some(number);
                ctx.notify_observed(number);
                if forwarded > 0 {
                    debug!(chain_id = %ctx.chain_id, block = number, %forwarded, "forwarded block events");
                }
            }
        }
        PollAction::Noop => {}
    }

    Ok(action)
}

/// Fetches, decodes and enqueues every interesting log of one block.
///
/// Returns the number of events enqueued. Undecodable logs and events that hit the enqueue
/// timeout are skipped.
async fn process_block<C: ChainClient>(number: u64, ctx: &EvmPollerCtx<C>) -> Result<usize> {
    let block = ctx
        .client
        .block_by_number(number)
        .await?
        .ok_or(PollerError::BlockNotFound(number))?;

    let logs = fetch_block_logs(number, ctx).await?;

    let mut forwarded = 0;
    for log in logs {
        let decoded = match DecodedLog::from_rpc(&log) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(chain_id = %ctx.chain_id, block = number, address = %log.inner.address, %err, "skipping undecodable log");
                continue;
            }
        };
        if enqueue(decoded, &block, ctx).await? {
            forwarded += 1;
        }
    }

    Ok(forwarded)
}

/// Queries every contract for the block concurrently. Any failure fails the block.
async fn fetch_block_logs<C: ChainClient>(
    number: u64,
    ctx: &EvmPollerCtx<C>,
) -> Result<Vec<alloy_rpc_types_eth::Log>> {
    let fetches = ctx
        .contracts
        .iter()
        .map(|addr| ctx.client.logs(LogFilter::single_block(*addr, number)));
    let results = join_all(fetches).await;

    let mut logs = Vec::new();
    let mut errors = Vec::new();
    for (addr, res) in ctx.contracts.iter().zip(results) {
        match res {
            Ok(batch) => logs.extend(batch),
            Err(err) => errors.push(format!("{addr}: {err}")),
        }
    }

    if !errors.is_empty() {
        return Err(PollerError::LogFetch {
            block: number,
            errors: errors.join("; "),
        });
    }

    logs.sort_by_key(|log| log.log_index);
    Ok(logs)
}

/// Returns `Ok(false)` if the event was dropped because the queue stayed full.
async fn enqueue<C>(log: DecodedLog, block: &EthBlock, ctx: &EvmPollerCtx<C>) -> Result<bool> {
    let event = LogWithBlock {
        log,
        block: block.clone(),
    };
    match ctx.event_tx.send_timeout(event, ctx.enqueue_timeout).await {
        Ok(()) => Ok(true),
        Err(SendTimeoutError::Timeout(event)) => {
            warn!(
                chain_id = %ctx.chain_id,
                block = block.number,
                event = event.log.event.name(),
                "event queue full, dropping event"
            );
            Ok(false)
        }
        Err(SendTimeoutError::Closed(_)) => Err(PollerError::ChannelClosed),
    }
}
