//! Batch scheduler for brecup.
//!
//! This crate provides:
//! - `DevicePool`: exclusive leases over a fixed set of compute devices
//! - `TranscodeStage`: one worker per device, fed from a shared queue
//! - `CollectionResolver` and `UploadStage`: a single upload lane that
//!   creates the collection once and appends everything else
//! - `Orchestrator`: runs both stages and waits for them to drain
//! - Batch loading, record preparation and structured logging

pub mod collection;
pub mod config;
pub mod devices;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod prepare;
pub mod transcode_stage;
pub mod upload_stage;

pub use collection::CollectionResolver;
pub use config::{load_batch_config, parse_batch_config, WorkerConfig};
pub use devices::{DeviceLease, DevicePool, PoolStats};
pub use error::{WorkerError, WorkerResult};
pub use logging::RecordLogger;
pub use orchestrator::{run_batch, Orchestrator, RunSummary};
pub use prepare::prepare_records;
pub use transcode_stage::{transcode_one, TranscodeStage};
pub use upload_stage::{DeliveredPart, UploadReport, UploadStage};
