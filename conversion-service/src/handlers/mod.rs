pub mod convert;
pub mod health;
pub mod index;
pub mod tasks;
pub mod upload;

pub use convert::{pdf_to_word, word_to_pdf};
pub use health::{health_check, metrics_endpoint};
pub use index::index;
pub use tasks::{download_task, submit_pdf_to_doc, submit_pdf_to_word, submit_word_to_pdf, task_status};
