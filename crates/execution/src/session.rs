//! Lifetime of a single task: broadcast, collect, finalize.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, Bytes};
use cohort_aggregation::{AggregatedCertificate, AggregationError, TaskResultAggregator};
use cohort_crypto::Signature;
use cohort_primitives::{Task, TaskResult};
use cohort_rpc_types::RpcTaskSubmission;
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, error::TrySendError},
    task::JoinSet,
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{errors::Result, executor_client::ExecutorClient};

/// How long a finalized session may wait for room in the results queue.
const RESULTS_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Aggregator identity attached to every task broadcast.
#[derive(Clone, Debug)]
pub struct SessionParams {
    pub aggregator_address: Address,
    pub aggregator_url: String,
    pub threshold_percentage: u8,
}

/// How a session's `process` call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Threshold met and a certificate produced.
    Completed,
    DeadlineExceeded,
    /// Stopped from outside before reaching the threshold.
    Cancelled,
}

/// What happened to a result handed to [`TaskSession::record_result`].
#[derive(Debug)]
pub enum RecordOutcome {
    Recorded,
    /// This result pushed the session over its threshold.
    Finalized,
    /// The session had already finalized; the result was dropped.
    AlreadyFinalized,
    Rejected(AggregationError),
    /// No in-flight session for the result's task.
    UnknownTask,
}

impl RecordOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RecordOutcome::Recorded | RecordOutcome::Finalized)
    }
}

/// Delivery counts of one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Collects results for one task until its threshold or deadline.
///
/// A session finalizes at most once. On finalization it cancels its own token and pushes
/// itself onto the manager's results queue.
pub struct TaskSession {
    task: Task,
    params: SessionParams,
    aggregator_signature: Signature,
    aggregator: TaskResultAggregator,
    executor_client: Arc<dyn ExecutorClient>,
    results_tx: mpsc::Sender<Arc<TaskSession>>,
    cancel: CancellationToken,
    finalized: AtomicBool,
    certificate: OnceLock<AggregatedCertificate>,
}

impl fmt::Debug for TaskSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSession")
            .field("task_id", &self.task.task_id)
            .field("recipients", &self.task.recipient_operators.len())
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

impl TaskSession {
    /// Fails if the task cannot be aggregated, e.g. it has no recipients.
    pub fn new(
        task: Task,
        params: SessionParams,
        aggregator_signature: Signature,
        executor_client: Arc<dyn ExecutorClient>,
        results_tx: mpsc::Sender<Arc<TaskSession>>,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>> {
        let aggregator = TaskResultAggregator::new(
            task.task_id,
            task.block_number,
            task.operator_set_id,
            params.threshold_percentage,
            task.payload.clone(),
            task.deadline_unix_seconds,
            task.recipient_operators.clone(),
        )?;

        Ok(Arc::new(Self {
            task,
            params,
            aggregator_signature,
            aggregator,
            executor_client,
            results_tx,
            cancel,
            finalized: AtomicBool::new(false),
            certificate: OnceLock::new(),
        }))
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Certificate produced on finalization.
    pub fn certificate(&self) -> Option<&AggregatedCertificate> {
        self.certificate.get()
    }

    pub fn signer_count(&self) -> usize {
        self.aggregator.signer_count()
    }

    /// Broadcasts the task and waits until threshold, deadline or cancellation.
    pub async fn process(self: Arc<Self>) -> SessionOutcome {
        let task_id = self.task.task_id;
        info!(%task_id, recipients = self.task.recipient_operators.len(), "task session started");

        let deadline = deadline_instant(self.task.deadline_unix_seconds);
        let broadcast = self.broadcast();
        tokio::pin!(broadcast);
        let mut broadcast_done = false;

        let outcome = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    if self.is_finalized() {
                        break SessionOutcome::Completed;
                    }
                    break SessionOutcome::Cancelled;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.cancel.cancel();
                    break SessionOutcome::DeadlineExceeded;
                }
                summary = &mut broadcast, if !broadcast_done => {
                    broadcast_done = true;
                    info!(%task_id, delivered = summary.delivered, failed = summary.failed, "task broadcast completed");
                }
            }
        };

        match outcome {
            SessionOutcome::Completed => info!(%task_id, "task session done"),
            SessionOutcome::DeadlineExceeded => {
                warn!(%task_id, signers = self.signer_count(), "task session deadline exceeded")
            }
            SessionOutcome::Cancelled => info!(%task_id, "task session cancelled"),
        }
        outcome
    }

    /// Sends the task to every recipient concurrently and waits for all attempts.
    ///
    /// A failed or rejected delivery is logged and does not affect the others.
    pub async fn broadcast(&self) -> BroadcastSummary {
        let submission = RpcTaskSubmission {
            task_id: self.task.task_id,
            avs_address: self.task.avs_address,
            aggregator_address: self.params.aggregator_address,
            payload: self.task.payload.clone(),
            aggregator_url: self.params.aggregator_url.clone(),
            signature: self.encoded_aggregator_signature(),
        };

        let mut sends = JoinSet::new();
        for peer in &self.task.recipient_operators {
            let client = self.executor_client.clone();
            let submission = submission.clone();
            let peer = peer.clone();
            sends.spawn(async move {
                let res = client.submit_task(&peer, submission).await;
                (peer.operator_address, res)
            });
        }

        let task_id = self.task.task_id;
        let mut summary = BroadcastSummary::default();
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((operator, Ok(ack))) if ack.success => {
                    debug!(%task_id, %operator, "task delivered to executor");
                    summary.delivered += 1;
                }
                Ok((operator, Ok(ack))) => {
                    warn!(%task_id, %operator, message = ?ack.message, "executor rejected task");
                    summary.failed += 1;
                }
                Ok((operator, Err(err))) => {
                    warn!(%task_id, %operator, %err, "failed to submit task to executor");
                    summary.failed += 1;
                }
                Err(err) => {
                    error!(%task_id, %err, "task submission panicked");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Feeds one executor result into the aggregator.
    pub fn record_result(self: &Arc<Self>, result: &TaskResult) -> RecordOutcome {
        let task_id = self.task.task_id;
        let operator = result.operator_address;

        if self.is_finalized() {
            info!(%task_id, %operator, "task completion threshold already met");
            return RecordOutcome::AlreadyFinalized;
        }

        if let Err(err) = self.aggregator.process_new_signature(result) {
            warn!(%task_id, %operator, %err, "failed to process task result");
            return RecordOutcome::Rejected(err);
        }

        if !self.aggregator.signing_threshold_met() {
            return RecordOutcome::Recorded;
        }

        // only the first caller past the threshold finalizes
        if self.finalized.swap(true, Ordering::AcqRel) {
            return RecordOutcome::Recorded;
        }

        let certificate = match self.aggregator.generate_final_certificate() {
            Ok(certificate) => certificate,
            Err(err) => {
                error!(%task_id, %err, "failed to generate final certificate");
                return RecordOutcome::Recorded;
            }
        };
        info!(%task_id, %operator, signers = certificate.signer_operators.len(), "task completion threshold met");
        let _ = self.certificate.set(certificate);

        match self.results_tx.try_send(self.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(session)) => self.enqueue_when_ready(session),
            Err(TrySendError::Closed(_)) => {
                error!(%task_id, "results queue closed, dropping finalized task session");
            }
        }
        self.cancel.cancel();

        RecordOutcome::Finalized
    }

    /// Waits in the background for room in a full results queue, up to
    /// [`RESULTS_ENQUEUE_TIMEOUT`].
    fn enqueue_when_ready(&self, session: Arc<TaskSession>) {
        let task_id = self.task.task_id;
        let Ok(runtime) = Handle::try_current() else {
            error!(%task_id, "results queue full, dropping finalized task session");
            return;
        };

        warn!(%task_id, "results queue full, waiting for room");
        let results_tx = self.results_tx.clone();
        runtime.spawn(async move {
            if let Err(err) = results_tx
                .send_timeout(session, RESULTS_ENQUEUE_TIMEOUT)
                .await
            {
                error!(%task_id, %err, "failed to enqueue finalized task session");
            }
        });
    }

    fn encoded_aggregator_signature(&self) -> Bytes {
        match self.aggregator_signature.to_bytes() {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                error!(task_id = %self.task.task_id, %err, "failed to encode aggregator signature");
                Bytes::new()
            }
        }
    }
}

/// Maps an absolute unix deadline onto the tokio clock.
fn deadline_instant(deadline_unix_seconds: u64) -> Instant {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let remaining = Duration::from_secs(deadline_unix_seconds).saturating_sub(now);
    Instant::now() + remaining
}
