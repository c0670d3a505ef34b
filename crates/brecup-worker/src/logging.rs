//! Structured per-record logging.
//!
//! Every lifecycle event of a record is logged with the same `record` and
//! `stage` fields so a single record can be followed through a busy run.

use std::path::Path;

use tracing::{error, info, Span};

use brecup_models::{DeviceId, Record};

/// Record logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct RecordLogger {
    record: String,
    stage: &'static str,
}

impl RecordLogger {
    /// Create a logger for `record` in `stage` (e.g. "transcode", "upload").
    pub fn new(record: &Record, stage: &'static str) -> Self {
        Self {
            record: record.title.clone(),
            stage,
        }
    }

    pub fn device_picked(&self, device: &DeviceId) {
        info!(
            record = %self.record,
            stage = self.stage,
            device = %device,
            "picking device {} for {}", device, self.record
        );
    }

    pub fn log_path(&self, path: &Path) {
        info!(
            record = %self.record,
            stage = self.stage,
            "log for {}: {}", self.record, path.display()
        );
    }

    pub fn device_released(&self, device: &DeviceId) {
        info!(
            record = %self.record,
            stage = self.stage,
            device = %device,
            "releasing device {} for {}", device, self.record
        );
    }

    pub fn output_written(&self, path: &Path) {
        info!(
            record = %self.record,
            stage = self.stage,
            "Output {}", path.display()
        );
    }

    pub fn delivered(&self, kind: &str, handle: &str) {
        info!(
            record = %self.record,
            stage = self.stage,
            kind,
            handle,
            "Delivered {} ({} {})", self.record, kind, handle
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            record = %self.record,
            stage = self.stage,
            "Record error: {}", message
        );
    }

    /// Create a tracing span for this record.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("record", record = %self.record, stage = self.stage)
    }
}
