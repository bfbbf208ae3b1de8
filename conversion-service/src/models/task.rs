use crate::models::ConversionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertTask {
    pub task_id: String,
    pub original_filename: String,
    pub kind: ConversionKind,
    pub status: TaskStatus,
    pub file_url: Option<String>,
    pub error_message: Option<String>,
    /// Storage key of the converted file, set once the task completes.
    #[serde(skip)]
    pub output_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConvertTask {
    pub fn new(task_id: String, original_filename: String, kind: ConversionKind) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            original_filename,
            kind,
            status: TaskStatus::Pending,
            file_url: None,
            error_message: None,
            output_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
