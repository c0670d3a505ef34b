//! Shared data models for the brecup batch pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Batch configuration and per-record entries
//! - Prepared records and their lifecycle state
//! - Compute device identifiers
//! - Remote collection handles and resolution state
//! - Clip timestamps and transcode settings

pub mod collection;
pub mod config;
pub mod device;
pub mod encoding;
pub mod job;
pub mod record;
pub mod timestamp;

// Re-export common types
pub use collection::{CollectionHandle, CollectionMeta, CollectionState};
pub use config::{BatchConfig, ConfigError, RecordEntry};
pub use device::DeviceId;
pub use encoding::TranscodeSettings;
pub use job::{JobResult, RunId};
pub use record::{sanitize_filename_title, Record, RecordState};
pub use timestamp::{ClipRange, TimestampError};
