pub mod format;
pub mod task;

pub use format::{pdf_has_text_layer, ConversionKind, DocumentFormat, FormatRejection};
pub use task::{ConvertTask, TaskStatus};
