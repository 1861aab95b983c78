//! Worker composition: configuration, metadata contract, orchestration and
//! the polling loop.

pub mod config;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod scheduler;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use metadata::{JsonlMetadataStore, MemoryMetadataStore, MetadataStore};
pub use orchestrator::AnalysisOrchestrator;
pub use scheduler::PollingScheduler;
