//! Worker configuration.
//!
//! Two sources: the YAML batch file naming the records and the upload
//! destination, and environment knobs for the process itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use brecup_models::BatchConfig;

use crate::error::{WorkerError, WorkerResult};

/// Default scratch directory for side logs.
pub const DEFAULT_WORK_DIR: &str = "/tmp/brecup";
/// Default wait between creating a collection and looking its handle up.
pub const DEFAULT_PROPAGATION_DELAY_SECS: u64 = 10;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scratch directory; side logs go to `<work_dir>/logs`
    pub work_dir: PathBuf,
    /// Wait after a create before the listing shows the new collection
    pub propagation_delay: Duration,
    /// Raw `CUDA_VISIBLE_DEVICES` value, if set
    pub visible_devices: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            propagation_delay: Duration::from_secs(DEFAULT_PROPAGATION_DELAY_SECS),
            visible_devices: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("BRECUP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORK_DIR)),
            propagation_delay: Duration::from_secs(
                std::env::var("BRECUP_PROPAGATION_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PROPAGATION_DELAY_SECS),
            ),
            visible_devices: std::env::var("CUDA_VISIBLE_DEVICES")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Directory holding per-record transcode logs.
    pub fn log_dir(&self) -> PathBuf {
        self.work_dir.join("logs")
    }
}

/// Parse and validate a batch file from YAML text.
pub fn parse_batch_config(yaml: &str) -> WorkerResult<BatchConfig> {
    let config: BatchConfig = serde_yaml::from_str(yaml)
        .map_err(|e| WorkerError::config_error(format!("Invalid batch file: {e}")))?;
    config
        .validate()
        .map_err(|e| WorkerError::config_error(e.to_string()))?;
    Ok(config)
}

/// Load and validate a batch file.
pub async fn load_batch_config(path: impl AsRef<Path>) -> WorkerResult<BatchConfig> {
    let path = path.as_ref();
    let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
        WorkerError::config_error(format!("Cannot read {}: {e}", path.display()))
    })?;
    parse_batch_config(&yaml)
}
