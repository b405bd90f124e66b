//! Print Dispatch Queue
//!
//! 串行打印队列：FIFO，单一处理循环，失败的队首任务按退避重试，
//! 重试用尽后标记失败并出队。
//!
//! - At most one processing loop runs at a time (`is_processing` flag under the state lock)
//! - Enqueue never blocks on printing; it starts the loop if it is idle
//! - Every attempt waits for transport readiness and is bounded by a timeout

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use ticket_printer::PrintError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::transport::PrintTransport;
use super::types::{PrintJob, PrintJobKind, PrintJobStatus, PrintPayload, QueueStatus};

/// Why a single print attempt failed
#[derive(Debug, Error)]
pub enum PrintDispatchError {
    #[error("Transport error: {0}")]
    Transport(#[from] PrintError),

    #[error("Print attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport not ready after {0:?}")]
    TransportUnavailable(Duration),
}

/// Queue-level errors returned to callers
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Print queue is shut down")]
    ShutDown,

    #[error("No async runtime available to run the print queue")]
    NoRuntime,
}

/// Queue tuning
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Upper bound for a single transport send
    pub attempt_timeout: Duration,
    /// How long an attempt waits for the transport to become ready
    pub ready_timeout: Duration,
    /// Base delay before a retry
    pub initial_retry_delay: Duration,
    /// Added to the delay once per failed attempt so far
    pub backoff_increment: Duration,
    /// Attempts used by `enqueue`
    pub default_max_attempts: u32,
    /// Finished jobs kept for `status()`
    pub history_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(5),
            ready_timeout: Duration::from_secs(5),
            initial_retry_delay: Duration::from_millis(500),
            backoff_increment: Duration::from_millis(1000),
            default_max_attempts: 3,
            history_limit: 50,
        }
    }
}

impl QueueConfig {
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, initial: Duration, increment: Duration) -> Self {
        self.initial_retry_delay = initial;
        self.backoff_increment = increment;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.default_max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Delay before the next attempt, given the failed attempts so far
    pub fn retry_delay(&self, attempts: u32) -> Duration {
        self.initial_retry_delay + self.backoff_increment * attempts
    }
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<PrintJob>,
    is_processing: bool,
    recent: VecDeque<PrintJob>,
    completed_total: u64,
    failed_total: u64,
}

struct Inner {
    transport: Arc<dyn PrintTransport>,
    config: QueueConfig,
    state: Mutex<QueueState>,
    ready_tx: watch::Sender<bool>,
    /// `true` while no processing loop is running
    idle_tx: watch::Sender<bool>,
    shutdown: CancellationToken,
}

/// 打印分发队列
///
/// Cheap to clone; all clones share one queue.
#[derive(Clone)]
pub struct PrintDispatchQueue {
    inner: Arc<Inner>,
}

impl PrintDispatchQueue {
    /// Create a queue. The transport starts out ready.
    pub fn new(transport: Arc<dyn PrintTransport>, config: QueueConfig) -> Self {
        let (ready_tx, _) = watch::channel(true);
        let (idle_tx, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state: Mutex::new(QueueState::default()),
                ready_tx,
                idle_tx,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Enqueue a job with the default attempt budget
    pub fn enqueue(&self, kind: PrintJobKind, payload: PrintPayload) -> Result<String, QueueError> {
        self.enqueue_with_attempts(kind, payload, self.inner.config.default_max_attempts)
    }

    /// Append a job and make sure the processing loop is running.
    ///
    /// Returns the job ID. Must be called from within a Tokio runtime.
    pub fn enqueue_with_attempts(
        &self,
        kind: PrintJobKind,
        payload: PrintPayload,
        max_attempts: u32,
    ) -> Result<String, QueueError> {
        let mut ids = self.push_jobs(vec![PrintJob::new(kind, payload, max_attempts)])?;
        Ok(ids.remove(0))
    }

    /// Append several jobs back to back, all or none.
    ///
    /// No other job can land between them. Returns the job IDs in order.
    pub fn enqueue_batch(
        &self,
        jobs: Vec<(PrintJobKind, PrintPayload)>,
    ) -> Result<Vec<String>, QueueError> {
        let max_attempts = self.inner.config.default_max_attempts;
        self.push_jobs(
            jobs.into_iter()
                .map(|(kind, payload)| PrintJob::new(kind, payload, max_attempts))
                .collect(),
        )
    }

    fn push_jobs(&self, jobs: Vec<PrintJob>) -> Result<Vec<String>, QueueError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(QueueError::ShutDown);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| QueueError::NoRuntime)?;

        let ids: Vec<String> = jobs.iter().map(|job| job.id.clone()).collect();
        for job in &jobs {
            info!(
                job_id = %job.id,
                order_id = %job.payload.order_id,
                kind = %job.kind,
                "Print job enqueued"
            );
        }

        let (start_loop, queue_length) = {
            let mut state = self.inner.state.lock();
            state.jobs.extend(jobs);
            let start_loop = !state.is_processing && !state.jobs.is_empty();
            if start_loop {
                state.is_processing = true;
                self.inner.idle_tx.send_replace(false);
            }
            (start_loop, state.jobs.len())
        };
        debug!(queue_length, "Print queue length");

        if start_loop {
            let inner = self.inner.clone();
            runtime.spawn(inner.run());
        }

        Ok(ids)
    }

    /// Read-only snapshot of the queue
    pub fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock();
        QueueStatus {
            queue_length: state.jobs.len(),
            is_processing: state.is_processing,
            transport_ready: *self.inner.ready_tx.borrow(),
            jobs: state.jobs.iter().cloned().collect(),
            recent: state.recent.iter().cloned().collect(),
            completed_total: state.completed_total,
            failed_total: state.failed_total,
        }
    }

    /// Report transport readiness. Attempts wait (bounded) while not ready.
    pub fn set_transport_ready(&self, ready: bool) {
        let previous = self.inner.ready_tx.send_replace(ready);
        if previous != ready {
            info!(ready, "Print transport readiness changed");
        }
    }

    pub fn is_transport_ready(&self) -> bool {
        *self.inner.ready_tx.borrow()
    }

    /// Wait until the processing loop has stopped (queue drained or shut down)
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.idle_tx.subscribe();
        let _ = rx.wait_for(|idle| *idle).await;
    }

    /// Stop processing. Queued jobs stay queued; new jobs are rejected.
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            info!("Print queue shutting down");
            self.inner.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl Inner {
    /// The processing loop. Only one instance runs at a time.
    async fn run(self: Arc<Self>) {
        debug!("Print queue processing started");

        loop {
            // Claim the head, or release the processing flag under the same lock
            let job = {
                let mut state = self.state.lock();
                match state.jobs.front_mut() {
                    Some(job) => {
                        job.status = PrintJobStatus::Printing;
                        job.clone()
                    }
                    None => {
                        state.is_processing = false;
                        self.idle_tx.send_replace(true);
                        break;
                    }
                }
            };

            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                result = self.attempt(&job) => Some(result),
            };
            let Some(outcome) = outcome else {
                self.stop_processing();
                break;
            };

            match outcome {
                Ok(()) => {
                    self.finish_head(PrintJobStatus::Completed);
                    info!(
                        job_id = %job.id,
                        order_id = %job.payload.order_id,
                        kind = %job.kind,
                        attempts = job.attempts + 1,
                        "Print job completed"
                    );
                }
                Err(e) => {
                    let attempts = self.record_failure(&e);
                    if attempts >= job.max_attempts {
                        self.finish_head(PrintJobStatus::Failed);
                        error!(
                            job_id = %job.id,
                            order_id = %job.payload.order_id,
                            kind = %job.kind,
                            attempts,
                            error = %e,
                            "Print job failed, retries exhausted"
                        );
                        continue;
                    }

                    let delay = self.config.retry_delay(attempts);
                    warn!(
                        job_id = %job.id,
                        order_id = %job.payload.order_id,
                        attempt = attempts,
                        max_attempts = job.max_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Print attempt failed, retrying"
                    );

                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => {
                            self.stop_processing();
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        debug!("Print queue processing stopped");
    }

    /// One attempt: wait for readiness, then send under the attempt timeout
    async fn attempt(&self, job: &PrintJob) -> Result<(), PrintDispatchError> {
        self.wait_ready().await?;

        match tokio::time::timeout(self.config.attempt_timeout, self.transport.send(&job.payload))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PrintDispatchError::Transport(e)),
            Err(_) => Err(PrintDispatchError::Timeout(self.config.attempt_timeout)),
        }
    }

    async fn wait_ready(&self) -> Result<(), PrintDispatchError> {
        let mut rx = self.ready_tx.subscribe();
        if *rx.borrow_and_update() {
            return Ok(());
        }

        debug!(timeout_ms = self.config.ready_timeout.as_millis() as u64, "Waiting for print transport");
        let became_ready = tokio::time::timeout(self.config.ready_timeout, rx.wait_for(|ready| *ready))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false);

        if became_ready {
            Ok(())
        } else {
            Err(PrintDispatchError::TransportUnavailable(self.config.ready_timeout))
        }
    }

    /// Count a failed attempt on the head job; returns failed attempts so far
    fn record_failure(&self, e: &PrintDispatchError) -> u32 {
        let mut state = self.state.lock();
        match state.jobs.front_mut() {
            Some(job) => {
                job.attempts += 1;
                job.last_error = Some(e.to_string());
                job.status = PrintJobStatus::Pending;
                job.attempts
            }
            None => 0,
        }
    }

    /// Dequeue the head job with a final status and move it to history
    fn finish_head(&self, status: PrintJobStatus) {
        let mut state = self.state.lock();
        let Some(mut job) = state.jobs.pop_front() else {
            return;
        };
        job.status = status;
        job.finished_at = Some(shared::util::now_millis());
        match status {
            PrintJobStatus::Completed => state.completed_total += 1,
            PrintJobStatus::Failed => state.failed_total += 1,
            _ => {}
        }

        state.recent.push_back(job);
        while state.recent.len() > self.config.history_limit {
            state.recent.pop_front();
        }
    }

    /// Leave the head queued and release the processing flag
    fn stop_processing(&self) {
        let mut state = self.state.lock();
        if let Some(job) = state.jobs.front_mut() {
            job.status = PrintJobStatus::Pending;
        }
        state.is_processing = false;
        self.idle_tx.send_replace(true);
        info!(pending = state.jobs.len(), "Print queue stopped with pending jobs");
    }
}
