//! Upload error types.

use std::path::PathBuf;

use brecup_media::MediaError;
use thiserror::Error;

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors that can occur while talking to the remote collection service.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Credentials file not found: {0}")]
    CredentialsNotFound(PathBuf),

    #[error("Upload file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Create upload failed: {0}")]
    CreateFailed(#[source] MediaError),

    #[error("Append to {handle} failed: {source}")]
    AppendFailed {
        handle: String,
        #[source]
        source: MediaError,
    },

    #[error("List failed: {0}")]
    ListFailed(#[source] MediaError),
}

impl UploadError {
    pub fn append_failed(handle: impl Into<String>, source: MediaError) -> Self {
        Self::AppendFailed {
            handle: handle.into(),
            source,
        }
    }

    /// Exit code of the uploader process, when it ran at all.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CreateFailed(e) | Self::ListFailed(e) => e.exit_code(),
            Self::AppendFailed { source, .. } => source.exit_code(),
            _ => None,
        }
    }
}
