mod orchestrator;
mod sweeper;

pub use orchestrator::{enqueue, ConversionJob, WorkerOrchestrator};
pub use sweeper::TaskSweeper;
