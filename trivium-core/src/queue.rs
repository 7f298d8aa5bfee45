//! Publish queue — durable FIFO of publish jobs with retry/backoff.
//!
//! Guarantees: at most one in-flight submission per logical claim+stake+side,
//! jobs persisted before `enqueue` returns, strict enqueue order per network,
//! and every accepted job eventually delivered or reported `Failed`. All
//! mutations go through a single async lock, so two near-simultaneous
//! enqueues of the same logical claim cannot both be accepted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio_retry::strategy::ExponentialBackoff;
use uuid::Uuid;

use crate::chain::{ChainClient, TxId, TxIntent, Wallet};
use crate::config::QueueConfig;
use crate::error::SyncError;
use crate::models::{ClaimDraft, ClaimStatus, JobStatus, QueueJob, StakeSide};
use crate::network::NetworkContext;
use crate::store::JobStore;

/// Delay before the given attempt is retried. Pure mapping from attempt count
/// to duration, capped at the configured maximum.
pub fn backoff_delay(attempt: u32, config: &QueueConfig) -> Duration {
    let attempt = attempt.max(1) as usize;
    ExponentialBackoff::from_millis(config.backoff_base_ms)
        .max_delay(Duration::from_millis(config.backoff_max_ms))
        .nth(attempt - 1)
        .unwrap_or_else(|| Duration::from_millis(config.backoff_max_ms))
}

pub struct PublishQueue {
    jobs: Mutex<Vec<QueueJob>>,
    store: Arc<dyn JobStore>,
    wallet: Arc<dyn Wallet>,
    chain: Arc<dyn ChainClient>,
    network: Arc<NetworkContext>,
    config: QueueConfig,
    wake: Notify,
}

impl PublishQueue {
    pub fn new(
        store: Arc<dyn JobStore>,
        wallet: Arc<dyn Wallet>,
        chain: Arc<dyn ChainClient>,
        network: Arc<NetworkContext>,
        config: QueueConfig,
    ) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            store,
            wallet,
            chain,
            network,
            config,
            wake: Notify::new(),
        }
    }

    /// Restore the persisted job list. Jobs that were in flight when the
    /// process died are re-queued: without a chain-side idempotency key their
    /// outcome is unknowable, and re-submission is the conservative choice.
    /// Returns the number of restored jobs.
    pub async fn restore(&self) -> Result<usize, SyncError> {
        let mut restored = self.store.load().await?;
        for job in &mut restored {
            if job.status == JobStatus::InFlight {
                tracing::info!(job = %job.id, "Re-queueing job that was in flight at shutdown");
                job.status = JobStatus::Queued;
            }
        }
        let count = restored.len();

        let mut jobs = self.jobs.lock().await;
        *jobs = restored;
        self.store.persist(&jobs).await?;
        drop(jobs);

        self.wake.notify_one();
        Ok(count)
    }

    /// Accept a publish job for the draft. The draft must be publishable
    /// (`Exists` or `New`), and no live job may exist for the same
    /// claim+stake+side. The job is persisted before this returns, so a
    /// crash between enqueue and processing cannot lose it.
    pub async fn enqueue(
        &self,
        draft: &ClaimDraft,
        stake: u128,
        side: StakeSide,
    ) -> Result<Uuid, SyncError> {
        match draft.status {
            ClaimStatus::Exists | ClaimStatus::New => {}
            ClaimStatus::Invalid => {
                return Err(SyncError::Validation(
                    "draft failed validation and cannot be published".to_string(),
                ));
            }
            ClaimStatus::Draft | ClaimStatus::Validating => {
                return Err(SyncError::Validation(
                    "draft has not been validated yet".to_string(),
                ));
            }
        }

        let job = QueueJob::new(self.network.current(), draft.clone(), stake, side);
        let fingerprint = job.fingerprint();

        let mut jobs = self.jobs.lock().await;
        if let Some(live) = jobs
            .iter()
            .find(|j| !j.status.is_terminal() && j.fingerprint() == fingerprint)
        {
            return Err(SyncError::Validation(format!(
                "an identical claim is already pending as job {}",
                live.id
            )));
        }

        let id = job.id;
        tracing::info!(job = %id, network = %job.network, stake, "Enqueueing publish job");
        jobs.push(job);
        if let Err(e) = self.store.persist(&jobs).await {
            // Do not accept work we could not make durable.
            jobs.pop();
            return Err(e);
        }
        drop(jobs);

        self.wake.notify_one();
        Ok(id)
    }

    /// Snapshot of every job, in processing order.
    pub async fn jobs(&self) -> Vec<QueueJob> {
        self.jobs.lock().await.clone()
    }

    pub async fn job(&self, id: Uuid) -> Option<QueueJob> {
        self.jobs.lock().await.iter().find(|j| j.id == id).cloned()
    }

    /// Manually retry a failed job: attempts reset, back of the queue.
    pub async fn retry(&self, id: Uuid) -> Result<(), SyncError> {
        let mut jobs = self.jobs.lock().await;
        let index = jobs
            .iter()
            .position(|j| j.id == id && j.status == JobStatus::Failed)
            .ok_or_else(|| SyncError::Validation(format!("no failed job with id {}", id)))?;

        let mut job = jobs.remove(index);
        job.status = JobStatus::Queued;
        job.attempts = 0;
        job.not_before = None;
        jobs.push(job);
        self.store.persist(&jobs).await?;
        drop(jobs);

        self.wake.notify_one();
        Ok(())
    }

    /// Remove a terminal job after the caller has acknowledged it. Failed
    /// jobs are never removed implicitly.
    pub async fn dismiss(&self, id: Uuid) -> Result<(), SyncError> {
        let mut jobs = self.jobs.lock().await;
        let index = jobs
            .iter()
            .position(|j| j.id == id && j.status.is_terminal())
            .ok_or_else(|| {
                SyncError::Validation(format!("no terminal job with id {} to dismiss", id))
            })?;
        jobs.remove(index);
        self.store.persist(&jobs).await
    }

    /// Processor loop. Consumes jobs strictly in enqueue order for the
    /// active network; jobs targeting inactive networks stay queued. Runs
    /// until the shutdown channel fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Publish queue processor started");
        loop {
            let next = match self.take_next().await {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim next job");
                    None
                }
            };

            match next {
                Some(job) => {
                    self.process(job).await;
                    // Yield to shutdown between jobs.
                    if shutdown.try_recv().is_ok() {
                        break;
                    }
                }
                None => {
                    let poll = Duration::from_millis(self.config.poll_interval_ms);
                    tokio::select! {
                        _ = self.wake.notified() => {}
                        _ = tokio::time::sleep(poll) => {}
                        _ = shutdown.recv() => break,
                    }
                }
            }
        }
        tracing::info!("Publish queue processor stopped");
    }

    /// Claim the first ready job for the active network, marking it in
    /// flight and persisting the transition before it is handed out.
    async fn take_next(&self) -> Result<Option<QueueJob>, SyncError> {
        let active = self.network.current();
        let now = Utc::now();

        let mut jobs = self.jobs.lock().await;
        let Some(index) = jobs.iter().position(|j| j.is_ready(&active, now)) else {
            return Ok(None);
        };

        jobs[index].status = JobStatus::InFlight;
        let snapshot = jobs[index].clone();
        if let Err(e) = self.store.persist(&jobs).await {
            jobs[index].status = JobStatus::Queued;
            return Err(e);
        }
        Ok(Some(snapshot))
    }

    /// Sign, submit, and confirm one job, then record the outcome.
    async fn process(&self, job: QueueJob) {
        let id = job.id;
        tracing::info!(job = %id, attempt = job.attempts + 1, "Processing publish job");
        let outcome = self.submit_job(&job).await;

        let mut jobs = self.jobs.lock().await;
        let Some(index) = jobs.iter().position(|j| j.id == id) else {
            // Dismissed while in flight; nothing to record.
            return;
        };

        match outcome {
            Ok(tx_id) => {
                let job = &mut jobs[index];
                job.attempts += 1;
                job.status = JobStatus::Succeeded;
                job.tx_id = Some(tx_id.0.clone());
                job.last_error = None;
                job.not_before = None;
                tracing::info!(job = %id, tx = %tx_id.0, attempts = job.attempts, "Publish confirmed");
            }
            Err(e) => {
                let job = &mut jobs[index];
                job.attempts += 1;
                job.last_error = Some(e.to_string());

                if e.is_retryable() && job.attempts < self.config.max_attempts {
                    let mut delay = backoff_delay(job.attempts, &self.config);
                    if let Some(hint) = e.retry_hint_ms() {
                        delay = delay.max(Duration::from_millis(hint));
                    }
                    job.status = JobStatus::Queued;
                    job.not_before = Some(
                        Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default(),
                    );
                    tracing::warn!(
                        job = %id,
                        attempts = job.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Publish failed, re-queueing with backoff"
                    );
                    // Back of the queue, so later distinct jobs are not
                    // blocked behind the backoff gate.
                    let requeued = jobs.remove(index);
                    jobs.push(requeued);
                } else {
                    job.status = JobStatus::Failed;
                    tracing::error!(job = %id, attempts = job.attempts, error = %e, "Publish failed permanently");
                }
            }
        }

        if let Err(e) = self.store.persist(&jobs).await {
            tracing::error!(job = %id, error = %e, "Failed to persist job outcome");
        }
    }

    async fn submit_job(&self, job: &QueueJob) -> Result<TxId, SyncError> {
        let intent = TxIntent::from_job(job)?;
        let request_timeout = Duration::from_secs(self.config.request_timeout_secs);

        let signed = with_timeout(request_timeout, self.wallet.sign(&intent)).await?;
        let tx_id = with_timeout(request_timeout, self.chain.submit(&signed)).await?;
        let receipt = with_timeout(
            Duration::from_secs(self.config.confirmation_timeout_secs),
            self.chain.await_confirmation(&tx_id),
        )
        .await?;

        if receipt.success {
            Ok(receipt.tx_id)
        } else {
            Err(SyncError::Transaction(format!(
                "transaction {} reverted in block {}",
                receipt.tx_id.0, receipt.block
            )))
        }
    }
}

/// A timed-out remote call is indistinguishable from a network failure for
/// retry purposes.
async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, SyncError>>,
) -> Result<T, SyncError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Network(format!(
            "remote call timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

// ============================================================================
// TESTS
// ============================================================================
