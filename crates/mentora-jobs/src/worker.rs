//! Job worker: claims leases from each registered queue and runs handlers
//! concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{broadcast, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use mentora_core::{defaults, Job, JobRepository, QueueName};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when a queue is empty.
    pub poll_interval_ms: u64,
    /// Whether to enable job processing.
    pub enabled: bool,
    /// Override for the content queue's concurrent lease count.
    pub content_concurrency: usize,
    /// Override for the grading queue's concurrent lease count.
    pub grading_concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            enabled: true,
            content_concurrency: defaults::CONTENT_CONCURRENCY,
            grading_concurrency: defaults::GRADING_CONCURRENCY,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_POLL_INTERVAL_MS` | `500` | Polling interval when queues are empty |
    /// | `CONTENT_CONCURRENCY` | `10` | Concurrent content-generation leases |
    /// | `GRADING_CONCURRENCY` | `1` | Concurrent grading leases |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        let content_concurrency = std::env::var("CONTENT_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::CONTENT_CONCURRENCY)
            .max(1);

        let grading_concurrency = std::env::var("GRADING_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::GRADING_CONCURRENCY)
            .max(1);

        Self {
            poll_interval_ms,
            enabled,
            content_concurrency,
            grading_concurrency,
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Concurrent lease count for a queue.
    pub fn concurrency_for(&self, queue: QueueName) -> usize {
        match queue {
            QueueName::ChapterContent => self.content_concurrency,
            QueueName::Grading => self.grading_concurrency,
        }
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Worker started.
    WorkerStarted,
    /// A job lease began executing.
    JobStarted { job_id: Uuid, queue: QueueName },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, queue: QueueName },
    /// A job failed (it may still be retried by the queue).
    JobFailed {
        job_id: Uuid,
        queue: QueueName,
        error: String,
    },
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    loops: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Signal the worker to stop claiming new leases and wait for the queue
    /// loops to finish their in-flight jobs.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.loops {
            if let Err(e) = handle.await {
                error!(error = ?e, "Worker loop panicked during shutdown");
            }
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Job worker that processes jobs from the registered queues.
pub struct JobWorker {
    jobs: Arc<dyn JobRepository>,
    config: WorkerConfig,
    handlers: Vec<Arc<dyn JobHandler>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    /// Create a new job worker.
    pub fn new(jobs: Arc<dyn JobRepository>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            jobs,
            config,
            handlers: Vec::new(),
            event_tx,
        }
    }

    /// Register a handler for its queue.
    pub fn register_handler<H: JobHandler + 'static>(&mut self, handler: H) {
        debug!(queue = %handler.queue(), "Registered job handler");
        self.handlers.push(Arc::new(handler));
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start one claim loop per registered queue and return a control
    /// handle.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let event_rx = self.event_tx.subscribe();

        let mut loops = Vec::new();
        if self.config.enabled {
            let _ = self.event_tx.send(WorkerEvent::WorkerStarted);
            for handler in &self.handlers {
                let queue_loop = QueueLoop {
                    jobs: self.jobs.clone(),
                    handler: handler.clone(),
                    concurrency: self.config.concurrency_for(handler.queue()),
                    poll_interval: Duration::from_millis(self.config.poll_interval_ms),
                    event_tx: self.event_tx.clone(),
                };
                let mut shutdown = shutdown_rx.clone();
                loops.push(tokio::spawn(async move {
                    queue_loop.run(&mut shutdown).await;
                }));
            }
        } else {
            info!("Job worker is disabled, not starting");
        }

        WorkerHandle {
            shutdown_tx,
            event_rx,
            loops,
        }
    }
}

/// Claim-and-execute loop for a single queue.
struct QueueLoop {
    jobs: Arc<dyn JobRepository>,
    handler: Arc<dyn JobHandler>,
    concurrency: usize,
    poll_interval: Duration,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl QueueLoop {
    #[instrument(skip(self, shutdown), fields(subsystem = "jobs", component = "worker", queue = %self.handler.queue()))]
    async fn run(&self, shutdown: &mut watch::Receiver<bool>) {
        let queue = self.handler.queue();
        info!(
            concurrency = self.concurrency,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Queue loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Claim up to `concurrency` leases and run the batch to
            // completion before claiming more.
            let mut tasks = tokio::task::JoinSet::new();
            let mut claimed = 0;
            for _ in 0..self.concurrency {
                match self.jobs.claim_next(queue).await {
                    Ok(Some(job)) => {
                        claimed += 1;
                        let executor = self.executor();
                        tasks.spawn(async move {
                            executor.execute(job).await;
                        });
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "Failed to claim job");
                        break;
                    }
                }
            }

            if claimed == 0 {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = sleep(self.poll_interval) => {}
                }
            } else {
                debug!(claimed, "Processing job batch");
                while let Some(result) = tasks.join_next().await {
                    if let Err(e) = result {
                        error!(error = ?e, "Job task panicked");
                    }
                }
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Queue loop stopped");
    }

    fn executor(&self) -> JobExecutor {
        JobExecutor {
            jobs: self.jobs.clone(),
            handler: self.handler.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

/// Executes a single claimed job and acknowledges it one way or the other —
/// a leased job is never silently abandoned.
struct JobExecutor {
    jobs: Arc<dyn JobRepository>,
    handler: Arc<dyn JobHandler>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobExecutor {
    async fn execute(self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;
        let queue = job.queue;

        info!(job_id = %job_id, queue = %queue, "Processing job");
        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id, queue });

        // A panicking handler must not abandon its lease: the panic is
        // trapped and acknowledged as a job failure.
        let execution = std::panic::AssertUnwindSafe(self.handler.execute(JobContext::new(job)));
        let result = match execution.catch_unwind().await {
            Ok(result) => result,
            Err(_) => JobResult::Failed("Job handler panicked".to_string()),
        };

        match result {
            JobResult::Success => {
                if let Err(e) = self.jobs.complete(job_id).await {
                    error!(error = %e, job_id = %job_id, "Failed to mark job as completed");
                } else {
                    info!(
                        job_id = %job_id,
                        queue = %queue,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job completed successfully"
                    );
                    let _ = self
                        .event_tx
                        .send(WorkerEvent::JobCompleted { job_id, queue });
                }
            }
            JobResult::Failed(error) => {
                if let Err(e) = self.jobs.fail(job_id, &error).await {
                    error!(error = %e, job_id = %job_id, "Failed to mark job as failed");
                } else {
                    warn!(
                        job_id = %job_id,
                        queue = %queue,
                        error = %error,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job failed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        job_id,
                        queue,
                        error,
                    });
                }
            }
        }
    }
}

/// Builder for creating a job worker with handlers.
pub struct WorkerBuilder {
    jobs: Arc<dyn JobRepository>,
    config: WorkerConfig,
    handlers: Vec<Box<dyn JobHandler>>,
}

impl WorkerBuilder {
    /// Create a new worker builder.
    pub fn new(jobs: Arc<dyn JobRepository>) -> Self {
        Self {
            jobs,
            config: WorkerConfig::default(),
            handlers: Vec::new(),
        }
    }

    /// Set the worker configuration.
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a handler.
    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Build and return the worker.
    pub fn build(self) -> JobWorker {
        let mut worker = JobWorker::new(self.jobs, self.config);
        for handler in self.handlers {
            worker.handlers.push(Arc::from(handler));
        }
        worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, defaults::JOB_POLL_INTERVAL_MS);
        assert_eq!(config.content_concurrency, 10);
        assert_eq!(config.grading_concurrency, 1);
        assert!(config.enabled);
    }

    #[test]
    fn test_worker_config_builder() {
        let config = WorkerConfig::default()
            .with_poll_interval(1000)
            .with_enabled(false);

        assert_eq!(config.poll_interval_ms, 1000);
        assert!(!config.enabled);
    }

    #[test]
    fn test_concurrency_per_queue() {
        let config = WorkerConfig::default();
        assert_eq!(config.concurrency_for(QueueName::ChapterContent), 10);
        assert_eq!(config.concurrency_for(QueueName::Grading), 1);
    }

    #[test]
    fn test_worker_event_clone_and_debug() {
        let job_id = Uuid::new_v4();
        let event = WorkerEvent::JobFailed {
            job_id,
            queue: QueueName::Grading,
            error: "verdict decode failed".to_string(),
        };

        let cloned = event.clone();
        let debug_str = format!("{:?}", cloned);
        assert!(debug_str.contains("JobFailed"));
        assert!(debug_str.contains("Grading"));
    }
}
