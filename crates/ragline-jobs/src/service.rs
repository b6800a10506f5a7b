//! Admission queue and scale-up signalling
//!
//! The [`JobService`] owns the bounded handoff channel between request
//! ingress and the worker pool, plus the side channel the dispatcher
//! watches for scale-up signals. Submissions are blocking sends: a full
//! queue suspends the submitter, which is the system's only admission
//! control.

use crate::error::{StoreError, StoreResult};
use crate::model::{Job, JobKind};
use crate::store::{JobStore, MessageStore};
use ragline_config::QueueConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

pub struct JobService {
    queue_tx: async_channel::Sender<Job>,
    queue_rx: async_channel::Receiver<Job>,
    dispatch_tx: async_channel::Sender<()>,
    dispatch_rx: async_channel::Receiver<()>,
    admitted: AtomicU64,
    requests_per_new_worker: u64,
    job_store: Arc<dyn JobStore>,
    message_store: Arc<dyn MessageStore>,
}

impl JobService {
    pub fn new(
        config: &QueueConfig,
        job_store: Arc<dyn JobStore>,
        message_store: Arc<dyn MessageStore>,
    ) -> Self {
        let (queue_tx, queue_rx) = async_channel::bounded(config.buffer_limit);
        let (dispatch_tx, dispatch_rx) = async_channel::bounded(1);
        Self {
            queue_tx,
            queue_rx,
            dispatch_tx,
            dispatch_rx,
            admitted: AtomicU64::new(0),
            requests_per_new_worker: config.requests_per_new_worker,
            job_store,
            message_store,
        }
    }

    pub fn job_store(&self) -> &Arc<dyn JobStore> {
        &self.job_store
    }

    pub fn message_store(&self) -> &Arc<dyn MessageStore> {
        &self.message_store
    }

    /// Receiver handle workers compete on. FIFO per receiver; fan-out across
    /// receivers is arbitrary.
    pub fn queue(&self) -> async_channel::Receiver<Job> {
        self.queue_rx.clone()
    }

    /// Receiver the single dispatcher consumes scale-up signals from.
    pub fn dispatch_signals(&self) -> async_channel::Receiver<()> {
        self.dispatch_rx.clone()
    }

    /// Admit a job to the bounded queue, suspending while it is full.
    ///
    /// Every N-th admission, and every ingest admission, emits one scale-up
    /// signal: ingest jobs are batch-heavy and externally I/O-bound, so they
    /// get a dedicated attempt at parallelism regardless of request rate.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::QueueClosed` once shutdown has torn the queue
    /// down.
    pub async fn admit(&self, job: Job) -> StoreResult<()> {
        let kind = job.kind();
        let job_id = job.id.clone();

        metrics::gauge!("count_jobs_in_queue").increment(1.0);
        if let Err(e) = self.queue_tx.send(job).await {
            metrics::gauge!("count_jobs_in_queue").decrement(1.0);
            debug!(job_id, error = %e, "admission queue closed");
            return Err(StoreError::QueueClosed);
        }
        info!(job_id, "admitted job");

        let admitted = self.admitted.fetch_add(1, Ordering::Relaxed) + 1;
        if admitted % self.requests_per_new_worker == 0 || kind == JobKind::Ingest {
            metrics::gauge!("dispatcher_signal_count").increment(1.0);
            debug!(admitted, "signalling dispatcher");
            if self.dispatch_tx.send(()).await.is_err() {
                return Err(StoreError::QueueClosed);
            }
        }
        Ok(())
    }

    /// Close the queue so draining workers retire once it is empty.
    pub fn close(&self) {
        self.queue_tx.close();
        self.dispatch_tx.close();
    }
}
