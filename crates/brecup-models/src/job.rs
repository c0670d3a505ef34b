//! Hand-off types between pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::device::DeviceId;
use crate::record::Record;

/// Identifier of one batch run, used to correlate log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record whose transcode succeeded, on its way to the upload lane.
///
/// Only successes cross between the stages; a failed transcode ends the
/// transcode stage with an error instead.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// The record, in `Transcoded` state
    pub record: Record,
    /// Device that served the transcode (already released)
    pub device: DeviceId,
    /// Side log of the transcode
    pub log_path: PathBuf,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_unique() {
        assert_ne!(RunId::new(), RunId::new());
        assert_eq!(RunId::new().as_str().len(), 36);
    }
}
