//! Storage capabilities and tier migration for the CamTrap pipeline.
//!
//! This crate provides:
//! - The ingestion store capability and a filesystem-backed implementation
//! - The object store capability with S3 and in-memory implementations
//! - File selection, classification and skip routing
//! - Local staging of remote content
//! - Skip and backfill migration between storage tiers

pub mod error;
pub mod ingest;
pub mod memory;
pub mod migrate;
pub mod object_store;
pub mod selector;
pub mod staging;

pub use error::{StorageError, StorageResult};
pub use ingest::{FsIngestStore, IngestEntry, IngestStore};
pub use memory::MemoryObjectStore;
pub use migrate::{move_to_skipped, skipped_path, StorageMigrator, SKIPPED_PREFIX};
pub use object_store::{ObjectInfo, ObjectStore, S3Config, S3ObjectStore};
pub use selector::{IngestedFile, RemoteFileSelector, Selection, SkipReason};
pub use staging::{LocalStaging, StagedVideo};
