mod events;
mod jobs;
mod scheduler;
mod stats;

pub use events::{CollectionEvent, CollectionObserver};
pub use jobs::{BoxSensorJob, CollectionJob, OrchestratorJob, PowerMeterJob};
pub use scheduler::CollectionService;
pub use stats::CollectionStats;
