//! biliup CLI client.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use brecup_media::{CommandRunner, ExternalCommand};
use brecup_models::{CollectionHandle, CollectionMeta};

use crate::error::{UploadError, UploadResult};

/// Handle reported by the listing in dry-run mode.
pub const PLACEHOLDER_HANDLE: &str = "BV1234567";

/// Remote operations the upload lane needs.
#[async_trait]
pub trait CollectionUploader: Send + Sync {
    /// Create a new collection described by `meta` with `file` as its first part.
    ///
    /// The remote side does not return the new handle; it becomes visible
    /// through [`CollectionUploader::find_collection`] after a delay.
    async fn create_and_upload(&self, meta: &CollectionMeta, file: &Path) -> UploadResult<()>;

    /// Append `file` as a new part titled `title`.
    async fn append(&self, handle: &CollectionHandle, title: &str, file: &Path) -> UploadResult<()>;

    /// Look up a collection by title.
    async fn find_collection(&self, title: &str) -> UploadResult<Option<CollectionHandle>>;
}

/// `biliup` command-line uploader.
#[derive(Debug, Clone)]
pub struct BiliupClient {
    cookies: PathBuf,
    runner: CommandRunner,
}

impl BiliupClient {
    pub fn new(cookies: impl Into<PathBuf>, runner: CommandRunner) -> Self {
        Self {
            cookies: cookies.into(),
            runner,
        }
    }

    /// Fail early when the credential file is missing (skipped in dry-run).
    pub async fn check_credentials(&self) -> UploadResult<()> {
        if self.runner.is_dry_run() {
            return Ok(());
        }
        match tokio::fs::try_exists(&self.cookies).await {
            Ok(true) => Ok(()),
            _ => Err(UploadError::CredentialsNotFound(self.cookies.clone())),
        }
    }

    fn base_command(&self) -> ExternalCommand {
        ExternalCommand::new("biliup").arg("-u").path_arg(&self.cookies)
    }

    /// `biliup -u <cookies> upload --tid .. --title .. [--tag ..] [--cover ..] <file>`
    pub fn create_command(&self, meta: &CollectionMeta, file: &Path) -> ExternalCommand {
        let mut cmd = self
            .base_command()
            .arg("upload")
            .arg("--tid")
            .arg(meta.tid.to_string())
            .arg("--title")
            .arg(meta.title.clone());

        if !meta.tag.is_empty() {
            cmd = cmd.arg("--tag").arg(meta.tag.clone());
        }
        if let Some(cover) = &meta.cover {
            cmd = cmd.arg("--cover").path_arg(cover);
        }
        cmd.path_arg(file)
    }

    /// `biliup -u <cookies> append -v <handle> --title <title> <file>`
    pub fn append_command(&self, handle: &CollectionHandle, title: &str, file: &Path) -> ExternalCommand {
        self.base_command()
            .arg("append")
            .arg("-v")
            .arg(handle.as_str())
            .arg("--title")
            .arg(title)
            .path_arg(file)
    }

    pub fn list_command(&self) -> ExternalCommand {
        self.base_command().arg("list")
    }

    fn ensure_file(&self, file: &Path) -> UploadResult<()> {
        if !self.runner.is_dry_run() && !file.exists() {
            return Err(UploadError::FileNotFound(file.to_path_buf()));
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionUploader for BiliupClient {
    async fn create_and_upload(&self, meta: &CollectionMeta, file: &Path) -> UploadResult<()> {
        self.ensure_file(file)?;
        debug!("Creating collection '{}' with {}", meta.title, file.display());

        self.runner
            .run(&self.create_command(meta, file))
            .await
            .map_err(UploadError::CreateFailed)?;

        info!("Created collection '{}'", meta.title);
        Ok(())
    }

    async fn append(&self, handle: &CollectionHandle, title: &str, file: &Path) -> UploadResult<()> {
        self.ensure_file(file)?;

        self.runner
            .run(&self.append_command(handle, title, file))
            .await
            .map_err(|e| UploadError::append_failed(handle.as_str(), e))?;

        info!("Appended '{}' to {}", title, handle);
        Ok(())
    }

    async fn find_collection(&self, title: &str) -> UploadResult<Option<CollectionHandle>> {
        let placeholder = format!("{PLACEHOLDER_HANDLE}\t{title}\topen");
        let listing = self
            .runner
            .output(&self.list_command(), &placeholder)
            .await
            .map_err(UploadError::ListFailed)?;

        let handle = parse_listing(&listing, title);
        match &handle {
            Some(h) => info!("Got collection handle {} for '{}'", h, title),
            None => warn!("No collection titled '{}' in listing", title),
        }
        Ok(handle)
    }
}

/// Pick the handle of the first listing line that mentions `title`.
///
/// Listing lines are tab separated with the handle in the first column.
pub fn parse_listing(listing: &str, title: &str) -> Option<CollectionHandle> {
    listing
        .lines()
        .find(|line| line.contains(title))
        .and_then(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|handle| !handle.is_empty())
        .map(CollectionHandle::new)
}
