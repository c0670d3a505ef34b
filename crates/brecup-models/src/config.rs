//! Batch configuration schema.
//!
//! Mirrors the YAML file handed to the `brecup` binary:
//!
//! ```yaml
//! output-dir: /data/clips
//! cookies: cookies.json
//! title: "Stream highlights 2024-05-01"
//! tid: 171
//! tag: "vod,highlights"
//! cover: cover.jpg
//! records:
//!   - video: /rec/part1.flv
//!     ss: "00:10:00"
//!     to: "01:20:00"
//!     title: "Part 1"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::collection::CollectionMeta;
use crate::encoding::TranscodeSettings;
use crate::timestamp::{ClipRange, TimestampError};

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No records configured")]
    NoRecords,

    #[error("Record {index}: title is empty")]
    EmptyRecordTitle { index: usize },

    #[error("Record {index} ('{title}'): {source}")]
    InvalidClip {
        index: usize,
        title: String,
        #[source]
        source: TimestampError,
    },

    #[error("Collection title is empty")]
    EmptyCollectionTitle,
}

/// One record as written in the batch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Source recording
    pub video: PathBuf,
    /// Danmaku source (XML) or prepared overlay (ASS); defaults to the
    /// video path with an `.xml` extension
    #[serde(default)]
    pub danmaku: Option<PathBuf>,
    /// Clip start
    pub ss: String,
    /// Clip end
    pub to: String,
    /// Per-part title used for appends
    pub title: String,
}

impl RecordEntry {
    /// Parse this entry's clip window.
    pub fn clip(&self) -> Result<ClipRange, TimestampError> {
        ClipRange::parse(&self.ss, &self.to)
    }
}

/// Whole batch: records plus upload destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchConfig {
    pub records: Vec<RecordEntry>,

    /// Directory transcoded files are written to
    pub output_dir: PathBuf,

    /// Uploader credential file
    pub cookies: PathBuf,

    #[serde(flatten)]
    pub collection: CollectionMeta,

    /// Append to a collection with the same title if one already exists
    #[serde(default)]
    pub reuse_existing: bool,

    #[serde(default)]
    pub encoding: TranscodeSettings,
}

impl BatchConfig {
    /// Validate the batch before anything is scheduled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.records.is_empty() {
            return Err(ConfigError::NoRecords);
        }
        if self.collection.title.trim().is_empty() {
            return Err(ConfigError::EmptyCollectionTitle);
        }

        for (index, entry) in self.records.iter().enumerate() {
            if entry.title.trim().is_empty() {
                return Err(ConfigError::EmptyRecordTitle { index });
            }
            entry.clip().map_err(|source| ConfigError::InvalidClip {
                index,
                title: entry.title.clone(),
                source,
            })?;
        }

        Ok(())
    }
}
