use crate::config::WorkerConfig;
use crate::models::ConvertTask;
use crate::services::{ConversionService, TaskStore};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Evicts finished tasks once their TTL has passed, together with the
/// workspace holding their output. On shutdown every task workspace is
/// removed.
pub struct TaskSweeper {
    conversions: ConversionService,
    tasks: TaskStore,
    ttl: Duration,
    interval: Duration,
}

impl TaskSweeper {
    pub fn new(config: &WorkerConfig, conversions: ConversionService, tasks: TaskStore) -> Self {
        Self {
            conversions,
            tasks,
            ttl: config.task_ttl(),
            interval: config.sweep_interval(),
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            ttl_secs = self.ttl.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Starting task sweeper"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }

        let purged = self.purge().await;
        tracing::info!(purged, "Task sweeper stopped");
    }

    /// Drop expired tasks. Returns how many were evicted.
    pub async fn sweep(&self) -> usize {
        let expired = self.tasks.evict_expired(self.ttl);
        for task in &expired {
            self.remove_workspace(task).await;
        }

        if !expired.is_empty() {
            tracing::info!(evicted = expired.len(), "Evicted expired tasks");
        }
        expired.len()
    }

    /// Drop every task and its workspace.
    pub async fn purge(&self) -> usize {
        let tasks = self.tasks.drain();
        for task in &tasks {
            self.remove_workspace(task).await;
        }
        tasks.len()
    }

    // Task workspaces are named after the task id
    async fn remove_workspace(&self, task: &ConvertTask) {
        if let Err(e) = self
            .conversions
            .storage()
            .delete_workspace(&task.task_id)
            .await
        {
            tracing::warn!(
                task_id = %task.task_id,
                error = %e,
                "Failed to remove task workspace"
            );
        }
    }
}
