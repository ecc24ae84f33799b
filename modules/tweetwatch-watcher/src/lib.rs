pub mod dedup;
pub mod extractor;
pub mod orchestrator;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod traits;

pub use orchestrator::Orchestrator;
pub use scheduler::{Scheduler, SchedulerHandle, WorkerGroup};
