//! Prepared records and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::device::DeviceId;
use crate::timestamp::ClipRange;

/// Where a record is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Waiting for a device
    #[default]
    Pending,
    /// Held by a transcode worker
    Transcoding,
    /// Output written, waiting for upload
    Transcoded,
    /// Uploaded to the collection
    Delivered,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::Transcoding => "transcoding",
            RecordState::Transcoded => "transcoded",
            RecordState::Delivered => "delivered",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work, fully resolved and ready for scheduling.
///
/// A record is owned by exactly one stage at a time: the transcode worker
/// that holds it writes `device`, the upload lane marks it delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Position in the configured list
    pub index: usize,
    /// Per-part title
    pub title: String,
    /// Source recording
    pub video: PathBuf,
    /// Subtitle/overlay artifact burned into the video
    pub overlay: PathBuf,
    /// Clip window
    pub clip: ClipRange,
    /// Transcoded file
    pub output: PathBuf,
    /// Device assigned while transcoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceId>,
    #[serde(default)]
    pub state: RecordState,
}

impl Record {
    pub fn new(
        index: usize,
        title: impl Into<String>,
        video: impl Into<PathBuf>,
        overlay: impl Into<PathBuf>,
        clip: ClipRange,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index,
            title: title.into(),
            video: video.into(),
            overlay: overlay.into(),
            clip,
            output: output.into(),
            device: None,
            state: RecordState::Pending,
        }
    }

    /// Bind the record to a device for the duration of its transcode.
    pub fn start_transcode(&mut self, device: DeviceId) {
        self.device = Some(device);
        self.state = RecordState::Transcoding;
    }

    pub fn finish_transcode(&mut self) {
        self.state = RecordState::Transcoded;
    }

    pub fn mark_delivered(&mut self) {
        self.state = RecordState::Delivered;
    }

    /// File name of this record's diagnostic transcode log.
    pub fn log_file_name(&self) -> String {
        format!("{:03}-{}.log", self.index, sanitize_filename_title(&self.title))
    }
}

/// Reduce a title to something safe to embed in a file name.
///
/// Keeps alphanumerics (any script), `-` and `_`; collapses whitespace to
/// `_`; caps the length at 50 characters.
pub fn sanitize_filename_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
        .chars()
        .take(50)
        .collect();

    if cleaned.is_empty() {
        "record".to_string()
    } else {
        cleaned
    }
}
