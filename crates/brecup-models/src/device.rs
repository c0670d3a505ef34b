//! Compute device identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one exclusive-use accelerator.
///
/// Either a platform id taken verbatim from `CUDA_VISIBLE_DEVICES`
/// (`"0"`, `"GPU-5f3c..."`) or an index produced by a device-count probe.
/// The value is what the transcoder exports as `CUDA_VISIBLE_DEVICES` for
/// the child process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Create from a platform-specific id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create from a probed device index.
    pub fn from_index(index: usize) -> Self {
        Self(index.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
