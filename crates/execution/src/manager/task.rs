use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use cohort_primitives::{LogWithBlock, Task, TaskId};
use dashmap::mapref::entry::Entry;
use tokio::{
    sync::mpsc,
    task::{self, JoinError, JoinSet},
};
use tracing::{debug, error, info, warn};

use super::{
    ctx::ExecutionManagerCtx,
    events::{handle_chain_event, EventAction},
    ManagerState,
};
use crate::{
    contract_caller::TxReceipt,
    errors::ExecutionError,
    session::{SessionOutcome, TaskSession},
};

type SubmissionResult = (TaskId, Result<TxReceipt, ExecutionError>);

pub(crate) async fn execution_manager_task(
    mut state: ManagerState,
    ctx: ExecutionManagerCtx,
    mut event_rx: mpsc::Receiver<LogWithBlock>,
    mut task_rx: mpsc::Receiver<Task>,
    mut results_rx: mpsc::Receiver<Arc<TaskSession>>,
) {
    let avs_address = ctx.config.avs_address;
    info!(%avs_address, "execution manager started");

    let mut sessions: JoinSet<SessionOutcome> = JoinSet::new();
    let mut session_tasks: HashMap<task::Id, TaskId> = HashMap::new();
    let mut submissions: JoinSet<SubmissionResult> = JoinSet::new();

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,

            Some(event) = event_rx.recv() => {
                match handle_chain_event(&mut state, &ctx, event).await {
                    Ok(EventAction::Ignored) => {}
                    Ok(action) => debug!(%avs_address, ?action, "handled chain event"),
                    Err(err) => warn!(%avs_address, %err, "failed to handle chain event"),
                }
            }

            Some(task) = task_rx.recv() => {
                match handle_task(&ctx, &mut sessions, task) {
                    Ok((id, task_id)) => {
                        session_tasks.insert(id, task_id);
                    }
                    Err(err) => warn!(%avs_address, %err, "failed to start task session"),
                }
            }

            Some(session) = results_rx.recv() => {
                if let Err(err) = submit_certificate(&ctx, &mut submissions, &session) {
                    error!(%avs_address, %err, "failed to submit task result");
                }
            }

            Some(joined) = sessions.join_next_with_id() => {
                on_session_exit(&ctx, &mut session_tasks, joined);
            }

            Some(joined) = submissions.join_next() => on_submission_done(joined),
        }
    }

    info!(%avs_address, "execution manager stopping");
    // session tokens are children of ours, so these all unwind promptly
    while let Some(joined) = sessions.join_next_with_id().await {
        on_session_exit(&ctx, &mut session_tasks, joined);
    }
    submissions.abort_all();
    ctx.inflight.clear();
    ctx.finalized.clear();
    info!(%avs_address, "execution manager stopped");
}

/// Starts a session for `task` unless one is already running or its deadline has passed.
fn handle_task(
    ctx: &ExecutionManagerCtx,
    sessions: &mut JoinSet<SessionOutcome>,
    task: Task,
) -> Result<(task::Id, TaskId), ExecutionError> {
    let task_id = task.task_id;
    if ctx.inflight.contains_key(&task_id) {
        return Err(ExecutionError::TaskAlreadyInFlight(task_id));
    }
    if task.is_expired(now_unix_seconds()) {
        return Err(ExecutionError::TaskExpired {
            task_id,
            deadline: task.deadline_unix_seconds,
        });
    }

    let signature = ctx.signer.sign_message(&task.payload);
    let session = TaskSession::new(
        task,
        ctx.session_params(),
        signature,
        ctx.executor_client.clone(),
        ctx.results_tx.clone(),
        ctx.cancel.child_token(),
    )?;

    match ctx.inflight.entry(task_id) {
        Entry::Occupied(_) => return Err(ExecutionError::TaskAlreadyInFlight(task_id)),
        Entry::Vacant(slot) => {
            slot.insert(session.clone());
        }
    }

    let abort = sessions.spawn(session.process());
    Ok((abort.id(), task_id))
}

fn on_session_exit(
    ctx: &ExecutionManagerCtx,
    session_tasks: &mut HashMap<task::Id, TaskId>,
    joined: Result<(task::Id, SessionOutcome), JoinError>,
) {
    let id = match &joined {
        Ok((id, _)) => *id,
        Err(err) => err.id(),
    };
    let Some(task_id) = session_tasks.remove(&id) else {
        return;
    };

    // record before dropping from inflight so a concurrent lookup sees one or the other
    let session = ctx.inflight.get(&task_id).map(|entry| entry.value().clone());
    if let Some(session) = session.filter(|s| s.is_finalized()) {
        ctx.finalized.insert(task_id, session.task().deadline_unix_seconds);
    }
    ctx.inflight.remove(&task_id);
    prune_finalized(ctx, now_unix_seconds());

    match joined {
        Ok((_, outcome)) => debug!(%task_id, ?outcome, "task session exited"),
        Err(err) => error!(%task_id, %err, "task session panicked"),
    }
}

/// Forgets finalized tasks whose deadline is behind `now`.
fn prune_finalized(ctx: &ExecutionManagerCtx, now: u64) {
    ctx.finalized.retain(|_, deadline| *deadline >= now);
}

/// Hands a finalized session's certificate to the contract caller of its chain.
fn submit_certificate(
    ctx: &ExecutionManagerCtx,
    submissions: &mut JoinSet<SubmissionResult>,
    session: &TaskSession,
) -> Result<(), ExecutionError> {
    let task = session.task();
    let task_id = task.task_id;
    let certificate = session
        .certificate()
        .cloned()
        .ok_or(ExecutionError::MissingCertificate(task_id))?;
    let caller = ctx
        .contract_caller(task.chain_id)
        .ok_or(ExecutionError::MissingContractCaller(task.chain_id))?;
    let write_delay = ctx.config.write_delay;

    submissions.spawn(async move {
        if !write_delay.is_zero() {
            tokio::time::sleep(write_delay).await;
        }
        let res = caller
            .submit_task_result(&certificate)
            .await
            .map_err(ExecutionError::from);
        (task_id, res)
    });
    Ok(())
}

fn on_submission_done(joined: Result<SubmissionResult, JoinError>) {
    match joined {
        Ok((task_id, Ok(receipt))) => info!(
            %task_id,
            tx_hash = %receipt.transaction_hash,
            success = receipt.success,
            "submitted task result"
        ),
        Ok((task_id, Err(err))) => error!(%task_id, %err, "failed to submit task result"),
        Err(err) => error!(%err, "task result submission panicked"),
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
