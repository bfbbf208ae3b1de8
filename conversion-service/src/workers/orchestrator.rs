use crate::config::WorkerConfig;
use crate::dtos::tasks::download_url;
use crate::models::{ConversionKind, DocumentFormat};
use crate::services::{ConversionService, TaskStore, Workspace};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub task_id: String,
    pub workspace: Workspace,
    pub kind: ConversionKind,
    pub input_format: DocumentFormat,
}

/// Runs queued jobs on a fixed set of workers. Each worker converts one job
/// at a time, so at most `worker_count` engines run concurrently.
pub struct WorkerOrchestrator {
    config: WorkerConfig,
    conversions: ConversionService,
    tasks: TaskStore,
    job_rx: Option<mpsc::Receiver<ConversionJob>>,
    shutdown_token: CancellationToken,
}

impl WorkerOrchestrator {
    pub fn new(
        config: WorkerConfig,
        conversions: ConversionService,
        tasks: TaskStore,
    ) -> (Self, mpsc::Sender<ConversionJob>) {
        let (job_tx, job_rx) = mpsc::channel(config.queue_size);

        let orchestrator = Self {
            config,
            conversions,
            tasks,
            job_rx: Some(job_rx),
            shutdown_token: CancellationToken::new(),
        };

        (orchestrator, job_tx)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn start(mut self) {
        let Some(job_rx) = self.job_rx.take() else {
            tracing::warn!("Worker pool already started");
            return;
        };

        let worker_count = self.config.worker_count.max(1);
        tracing::info!(
            worker_count,
            queue_size = self.config.queue_size,
            "Starting worker pool"
        );

        // Workers pull from one shared queue, so an idle worker always takes
        // the next job even while another is stuck on a slow conversion.
        let job_rx = Arc::new(Mutex::new(job_rx));
        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                conversions: self.conversions.clone(),
                tasks: self.tasks.clone(),
            };
            tokio::spawn(worker.run(job_rx.clone(), self.shutdown_token.clone()));
        }
    }
}

/// Queue a job without waiting. A full queue maps to 503.
pub fn enqueue(
    job_tx: &mpsc::Sender<ConversionJob>,
    job: ConversionJob,
) -> Result<(), AppError> {
    job_tx.try_send(job).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => {
            AppError::ServiceUnavailable("Conversion queue is full".to_string())
        }
        mpsc::error::TrySendError::Closed(_) => {
            AppError::ServiceUnavailable("Worker pool is not running".to_string())
        }
    })
}

type SharedReceiver = Arc<Mutex<mpsc::Receiver<ConversionJob>>>;

/// The lock is held only while waiting for a job, never while converting.
async fn next_job(jobs: &SharedReceiver) -> Option<ConversionJob> {
    jobs.lock().await.recv().await
}

struct Worker {
    id: usize,
    conversions: ConversionService,
    tasks: TaskStore,
}

impl Worker {
    async fn run(self, jobs: SharedReceiver, shutdown: CancellationToken) {
        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = next_job(&jobs) => job,
            };

            match job {
                Some(job) => self.process_job(job).await,
                None => {
                    tracing::info!(worker_id = self.id, "Job queue closed");
                    break;
                }
            }
        }
        tracing::debug!(worker_id = self.id, "Worker stopped");
    }

    async fn process_job(&self, job: ConversionJob) {
        let start = Instant::now();

        tracing::info!(
            worker_id = self.id,
            task_id = %job.task_id,
            kind = %job.kind,
            "Processing job started"
        );

        self.tasks.mark_processing(&job.task_id);

        match self
            .conversions
            .run(&job.workspace, job.kind, job.input_format)
            .await
        {
            Ok(output_key) => {
                if let Err(e) = self
                    .conversions
                    .storage()
                    .delete(&job.workspace.input_key())
                    .await
                {
                    tracing::warn!(task_id = %job.task_id, error = %e, "Failed to delete upload");
                }

                self.tasks
                    .mark_completed(&job.task_id, download_url(&job.task_id), output_key);

                tracing::info!(
                    worker_id = self.id,
                    task_id = %job.task_id,
                    duration_ms = start.elapsed().as_millis(),
                    "Processing succeeded"
                );
            }
            Err(e) => {
                self.conversions.discard(&job.workspace).await;
                self.tasks.mark_failed(&job.task_id, e.to_string());

                tracing::error!(
                    worker_id = self.id,
                    task_id = %job.task_id,
                    error = %e,
                    "Processing failed"
                );
            }
        }
    }
}
