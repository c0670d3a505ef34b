//! Remote collection handle and resolution state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque identifier the remote side assigns to a collection (a BV id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionHandle(pub String);

impl CollectionHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the destination collection within one run.
///
/// Moves from `Absent` to `Established` exactly once and never back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CollectionState {
    /// No remote collection exists yet
    #[default]
    Absent,
    /// Handle known and reusable for appends
    Established(CollectionHandle),
}

impl CollectionState {
    /// Get the established handle, if any.
    pub fn handle(&self) -> Option<&CollectionHandle> {
        match self {
            CollectionState::Absent => None,
            CollectionState::Established(handle) => Some(handle),
        }
    }

    pub fn is_established(&self) -> bool {
        matches!(self, CollectionState::Established(_))
    }
}

/// Metadata used when the collection is first created.
///
/// Appends only carry the per-record title; everything here applies to the
/// collection as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CollectionMeta {
    /// Collection title; also the filter used to look the handle up
    pub title: String,
    /// Remote category id
    pub tid: u32,
    /// Comma-separated tags
    #[serde(default)]
    pub tag: String,
    /// Cover image
    #[serde(default)]
    pub cover: Option<PathBuf>,
}
