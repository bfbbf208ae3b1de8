use crate::models::{ConversionKind, ConvertTask, TaskStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskSubmittedResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub status_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TaskStatusParams {
    #[serde(rename = "taskId", default)]
    #[validate(length(min = 1, max = 64, message = "taskId must not be empty"))]
    pub task_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub original_filename: String,
    pub kind: ConversionKind,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ConvertTask> for TaskResponse {
    fn from(task: ConvertTask) -> Self {
        Self {
            task_id: task.task_id,
            original_filename: task.original_filename,
            kind: task.kind,
            status: task.status,
            file_url: task.file_url,
            error_message: task.error_message,
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
        }
    }
}

pub fn status_url(task_id: &str) -> String {
    format!("/api/convert/task/status?taskId={}", task_id)
}

pub fn download_url(task_id: &str) -> String {
    format!("/api/convert/task/{}/download", task_id)
}
