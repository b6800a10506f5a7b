//! Adaptive worker pool: one dispatcher, demand-driven workers
//!
//! Exactly one dispatcher runs per process. It spawns the first worker at
//! startup and one more per scale-up signal while below the ceiling.
//! Scale-down belongs to the workers themselves: an idle worker retires
//! when the pool is above its floor. Workers never share per-job state;
//! coordination happens through the queue, the stop token, and the store.

use crate::service::RagService;
use chrono::Utc;
use ragline_common::RequestContext;
use ragline_config::WorkerPoolConfig;
use ragline_jobs::{Job, JobKind, JobService, JobStatus, JobStep};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

struct WorkerShared {
    jobs: Arc<JobService>,
    rag: Arc<dyn RagService>,
    config: WorkerPoolConfig,
    active: AtomicI64,
    stop: CancellationToken,
    /// Root lineage for job contexts; cancelled last, after the drain
    externals: CancellationToken,
    tracker: TaskTracker,
}

pub struct WorkerPool {
    shared: Arc<WorkerShared>,
}

impl WorkerPool {
    pub fn new(
        jobs: Arc<JobService>,
        rag: Arc<dyn RagService>,
        config: WorkerPoolConfig,
        externals: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(WorkerShared {
                jobs,
                rag,
                config,
                active: AtomicI64::new(0),
                stop: CancellationToken::new(),
                externals,
                tracker: TaskTracker::new(),
            }),
        }
    }

    pub fn active_workers(&self) -> i64 {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Spawn the dispatcher, which immediately spawns the first worker.
    pub fn start(&self) {
        let shared = Arc::clone(&self.shared);
        info!("initializing worker pool");
        spawn_worker(&shared);
        self.shared.tracker.spawn(dispatcher(shared));
    }

    /// Stop ingress-side handoff, signal workers, and wait for the drain.
    ///
    /// Returns `false` when in-flight jobs outlived the grace period; the
    /// caller decides whether that forces the process down.
    pub async fn shutdown(&self) -> bool {
        info!("stopping worker pool");
        self.shared.jobs.close();
        self.shared.stop.cancel();
        self.shared.tracker.close();
        match tokio::time::timeout(self.shared.config.shutdown_grace, self.shared.tracker.wait())
            .await
        {
            Ok(()) => {
                info!("worker pool drained");
                true
            }
            Err(_) => {
                warn!("worker pool did not drain within the shutdown grace");
                false
            }
        }
    }
}

async fn dispatcher(shared: Arc<WorkerShared>) {
    let signals = shared.jobs.dispatch_signals();
    info!("dispatcher started");
    loop {
        tokio::select! {
            () = shared.stop.cancelled() => break,
            signal = signals.recv() => match signal {
                Ok(()) => {
                    let active = shared.active.load(Ordering::SeqCst);
                    if active < shared.config.max_workers {
                        debug!(active, "scale-up signal, creating worker");
                        spawn_worker(&shared);
                    }
                }
                Err(_) => break,
            },
        }
    }
    debug!("dispatcher stopped");
}

fn spawn_worker(shared: &Arc<WorkerShared>) {
    shared.active.fetch_add(1, Ordering::SeqCst);
    metrics::gauge!("active_worker_count").increment(1.0);
    let worker_shared = Arc::clone(shared);
    shared.tracker.spawn(worker_loop(worker_shared));
    info!("created new worker");
}

fn retire(shared: &WorkerShared, reason: &str) {
    let remaining = shared.active.fetch_sub(1, Ordering::SeqCst) - 1;
    metrics::gauge!("active_worker_count").decrement(1.0);
    info!(reason, remaining, "removed worker");
}

/// Idle retirement must never take the pool below its floor; the
/// compare-exchange keeps two simultaneously idle workers from both
/// slipping past the check.
fn try_retire_idle(shared: &WorkerShared) -> bool {
    let mut current = shared.active.load(Ordering::SeqCst);
    while current > shared.config.min_workers {
        match shared.active.compare_exchange(
            current,
            current - 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                metrics::gauge!("active_worker_count").decrement(1.0);
                info!(remaining = current - 1, "idle worker timeout, removed worker");
                return true;
            }
            Err(actual) => current = actual,
        }
    }
    false
}

async fn worker_loop(shared: Arc<WorkerShared>) {
    let queue = shared.jobs.queue();
    loop {
        tokio::select! {
            received = queue.recv() => match received {
                Ok(job) => {
                    metrics::gauge!("count_jobs_in_queue").decrement(1.0);
                    execute_job(&shared, job).await;
                }
                Err(_) => {
                    retire(&shared, "queue closed");
                    return;
                }
            },
            () = shared.stop.cancelled() => {
                retire(&shared, "stop signal received");
                return;
            }
            () = tokio::time::sleep(shared.config.idle_timeout) => {
                if try_retire_idle(&shared) {
                    return;
                }
            }
        }
    }
}

async fn execute_job(shared: &Arc<WorkerShared>, mut job: Job) {
    let started = std::time::Instant::now();
    let ctx = RequestContext::new(job.trace_id.clone(), shared.externals.child_token());
    debug!(trace_id = %ctx.trace_id(), job_id = %job.id, "processing job");

    job.status = JobStatus::Running;
    save_job_state(shared, &ctx, &job).await;

    let processed = tokio::time::timeout(shared.config.job_timeout, async {
        match job.kind() {
            JobKind::Ingest => shared.rag.ingest_document(&ctx, job.clone()).await,
            JobKind::Query => run_query(shared, &ctx, job.clone()).await,
        }
    })
    .await;

    let mut finished = match processed {
        Ok(job) => job,
        Err(_) => {
            error!(job_id = %job.id, "job exceeded the worker deadline");
            job.fail(500, "Internal Server Error", true);
            job
        }
    };

    finished.ended_at = Some(Utc::now());
    // Error is terminal; everything else finalizes as Complete.
    if finished.status != JobStatus::Error {
        finished.status = JobStatus::Complete;
        finished.step = JobStep::Complete;
    }
    save_job_state(shared, &ctx, &finished).await;

    metrics::histogram!(
        "process_request_duration_seconds",
        "status" => finished.status.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

async fn run_query(shared: &Arc<WorkerShared>, ctx: &RequestContext, job: Job) -> Job {
    let chat_id = job.chat_id.clone().unwrap_or_default();
    let history = match shared
        .jobs
        .message_store()
        .get_message_history(ctx, &chat_id)
        .await
    {
        Ok(history) => history,
        Err(e) => {
            error!(trace_id = %ctx.trace_id(), error = %e, "failed to get message history");
            Vec::new()
        }
    };

    let processed = shared.rag.process_query(ctx, job, history).await;

    // Best-effort history append; never promotes to job failure.
    if processed.status != JobStatus::Error {
        if let Err(e) = shared
            .jobs
            .message_store()
            .try_save_chat(ctx, &chat_id, &processed.payload)
            .await
        {
            error!(trace_id = %ctx.trace_id(), error = %e, "failed to save chat history");
        }
    }
    processed
}

async fn save_job_state(shared: &Arc<WorkerShared>, ctx: &RequestContext, job: &Job) {
    if let Err(e) = shared.jobs.job_store().save_job(ctx, job).await {
        error!(trace_id = %ctx.trace_id(), job_id = %job.id, error = %e, "failed to persist job state");
    }
}
