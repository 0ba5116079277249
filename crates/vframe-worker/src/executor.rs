//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vframe_core::ProcessVideoService;
use vframe_queue::{FrameJobMessage, JobQueue};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Consumes dispatched job ids and runs them through the process
/// orchestrator, a bounded number at a time.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    processor: Arc<ProcessVideoService>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: JobQueue, processor: ProcessVideoService) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            processor: Arc::new(processor),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        // Initialize queue (consumer group)
        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        // Periodically claim messages abandoned by crashed workers
        let queue_clone = Arc::clone(&self.queue);
        let processor_clone = Arc::clone(&self.processor);
        let semaphore_clone = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let claim_interval = self.config.claim_interval;
        let claim_min_idle = self.config.claim_min_idle;
        let mut shutdown_rx_claim = self.shutdown.subscribe();

        let claim_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx_claim.changed() => {
                        if *shutdown_rx_claim.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue_clone
                            .claim_pending(&consumer_name, claim_min_idle.as_millis() as u64, 5)
                            .await
                        {
                            Ok(messages) if !messages.is_empty() => {
                                info!("Claimed {} pending messages", messages.len());
                                for (message_id, message) in messages {
                                    let processor = Arc::clone(&processor_clone);
                                    let queue = Arc::clone(&queue_clone);
                                    let Ok(permit) =
                                        semaphore_clone.clone().acquire_owned().await
                                    else {
                                        break;
                                    };

                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(processor, queue, message_id, message)
                                            .await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Failed to claim pending messages: {}", e);
                            }
                        }
                    }
                }
            }
        });

        // Main consumption loop
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Consume and process messages from the queue.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let messages = self
            .queue
            .consume(
                &self.consumer_name,
                self.config.poll_block.as_millis() as u64,
                available.min(5),
            )
            .await?;

        if messages.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} messages from queue", messages.len());

        for (message_id, message) in messages {
            let processor = Arc::clone(&self.processor);
            let queue = Arc::clone(&self.queue);
            let Ok(permit) = self.job_semaphore.clone().acquire_owned().await else {
                break;
            };

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(processor, queue, message_id, message).await;
            });
        }

        Ok(())
    }

    /// Execute one dispatched job.
    ///
    /// The orchestrator converts job-level failures into the Error state
    /// itself, so `execute` only errors on infrastructure problems. In
    /// that case the message is left unacked and gets redelivered via
    /// the pending claim.
    async fn execute_job(
        processor: Arc<ProcessVideoService>,
        queue: Arc<JobQueue>,
        message_id: String,
        message: FrameJobMessage,
    ) {
        let job_id = message.job_id;
        info!(job_id = %job_id, "Executing job");

        match processor.execute(&job_id).await {
            Ok(()) => {
                metrics::counter!("vframe_jobs_processed_total").increment(1);
                if let Err(e) = queue.ack(&message_id).await {
                    error!(job_id = %job_id, "Failed to ack message: {}", e);
                }
            }
            Err(e) => {
                metrics::counter!("vframe_jobs_failed_total").increment(1);
                error!(job_id = %job_id, "Job execution failed: {}", e);
            }
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
