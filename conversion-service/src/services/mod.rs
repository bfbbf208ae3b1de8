pub mod conversion;
pub mod metrics;
pub mod storage;
pub mod tasks;

pub use conversion::{ConversionService, Converted, Upload};
pub use metrics::{get_metrics, init_metrics};
pub use storage::{sanitize_filename, LocalStorage, Storage, Workspace};
pub use tasks::TaskStore;
