//! Log ingestion for logscan
//!
//! This crate provides line parsing, message normalization, the shared
//! aggregation counters and the concurrent file ingest pipeline.

mod config;
mod coordinator;
mod discover;
mod error;
mod normalize;
mod parser;
mod store;
mod worker;

pub use config::{DEFAULT_SHUTDOWN_TIMEOUT, IngestConfig, MIN_DEFAULT_WORKERS, default_workers};
pub use coordinator::{IngestCoordinator, IngestReport};
pub use discover::discover_files;
pub use error::{FileError, IngestError, ParseMiss, TimestampError};
pub use normalize::MessageNormalizer;
pub use parser::{LineParser, parse_timestamp};
pub use store::AggregationStore;
pub use worker::{FileOutcome, FileStatus, IngestContext, ingest_file};

// Re-export types used in our public API
pub use logscan_types::{RankedEntry, Record, Snapshot, top_k};
