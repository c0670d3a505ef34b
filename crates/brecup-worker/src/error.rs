//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Media error: {0}")]
    Media(#[from] brecup_media::MediaError),

    #[error("Upload error: {0}")]
    Upload(#[from] brecup_upload::UploadError),

    #[error("Device allocator invariant violated: {0}")]
    AllocatorInvariant(String),

    #[error("Collection resolution failed: {0}")]
    CollectionResolution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn allocator_invariant(msg: impl Into<String>) -> Self {
        Self::AllocatorInvariant(msg.into())
    }

    pub fn collection_resolution(msg: impl Into<String>) -> Self {
        Self::CollectionResolution(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    /// Exit code reported by the external tool behind this error, if any.
    pub fn tool_exit_code(&self) -> Option<i32> {
        match self {
            WorkerError::Media(e) => e.exit_code(),
            WorkerError::Upload(e) => e.exit_code(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brecup_media::MediaError;
    use brecup_upload::UploadError;

    #[test]
    fn test_tool_exit_code() {
        let failed = MediaError::command_failed("biliup", "exited with exit status: 2", None, Some(2));
        let upload = WorkerError::from(UploadError::append_failed("BV1bb", failed));
        assert_eq!(upload.tool_exit_code(), Some(2));

        let missing = WorkerError::from(MediaError::tool_not_found("ffmpeg"));
        assert_eq!(missing.tool_exit_code(), None);
        assert_eq!(WorkerError::allocator_invariant("double release").tool_exit_code(), None);
    }
}
