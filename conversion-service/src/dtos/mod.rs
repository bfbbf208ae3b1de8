pub mod tasks;

pub use tasks::{TaskResponse, TaskStatusParams, TaskSubmittedResponse};
