use crate::models::{ConversionKind, ConvertTask, TaskStatus};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// In-memory registry of asynchronous conversion tasks.
#[derive(Clone, Default)]
pub struct TaskStore {
    tasks: Arc<DashMap<String, ConvertTask>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, task_id: &str, original_filename: &str, kind: ConversionKind) -> ConvertTask {
        let task = ConvertTask::new(task_id.to_string(), original_filename.to_string(), kind);
        self.tasks.insert(task_id.to_string(), task.clone());
        task
    }

    pub fn get(&self, task_id: &str) -> Option<ConvertTask> {
        self.tasks.get(task_id).map(|t| t.clone())
    }

    pub fn remove(&self, task_id: &str) -> Option<ConvertTask> {
        self.tasks.remove(task_id).map(|(_, t)| t)
    }

    /// Remove finished tasks whose last update is at least `ttl` old.
    /// Pending and running tasks are never evicted.
    pub fn evict_expired(&self, ttl: Duration) -> Vec<ConvertTask> {
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            return Vec::new();
        };

        // Collect first: removing while iterating a DashMap deadlocks
        let expired: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.status.is_terminal() && t.updated_at <= cutoff)
            .map(|t| t.key().clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| {
                self.tasks
                    .remove_if(id, |_, t| t.status.is_terminal() && t.updated_at <= cutoff)
                    .map(|(_, t)| t)
            })
            .collect()
    }

    /// Remove every task, whatever its state.
    pub fn drain(&self) -> Vec<ConvertTask> {
        let ids: Vec<String> = self.tasks.iter().map(|t| t.key().clone()).collect();
        ids.iter()
            .filter_map(|id| self.tasks.remove(id).map(|(_, t)| t))
            .collect()
    }

    pub fn mark_processing(&self, task_id: &str) {
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.set_status(TaskStatus::Processing);
        }
    }

    pub fn mark_completed(&self, task_id: &str, file_url: String, output_key: String) {
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.file_url = Some(file_url);
            task.output_key = Some(output_key);
            task.set_status(TaskStatus::Completed);
        }
    }

    pub fn mark_failed(&self, task_id: &str, error_message: String) {
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.error_message = Some(error_message);
            task.set_status(TaskStatus::Failed);
        }
    }
}
