//! Lazy, single-writer resolution of the destination collection.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use brecup_models::{CollectionHandle, CollectionMeta, CollectionState, Record};
use brecup_upload::CollectionUploader;

use crate::error::{WorkerError, WorkerResult};

/// Owns the collection state for one run.
///
/// Only the upload lane holds a resolver, and every transition takes
/// `&mut self`, so at most one create can ever be issued.
pub struct CollectionResolver {
    uploader: Arc<dyn CollectionUploader>,
    meta: CollectionMeta,
    state: CollectionState,
    propagation_delay: Duration,
    creates: usize,
}

impl CollectionResolver {
    pub fn new(
        uploader: Arc<dyn CollectionUploader>,
        meta: CollectionMeta,
        propagation_delay: Duration,
    ) -> Self {
        Self {
            uploader,
            meta,
            state: CollectionState::Absent,
            propagation_delay,
            creates: 0,
        }
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    pub fn handle(&self) -> Option<&CollectionHandle> {
        self.state.handle()
    }

    /// Number of creates issued by this resolver.
    pub fn creates(&self) -> usize {
        self.creates
    }

    /// Adopt a collection with the configured title if one already exists.
    pub async fn lookup_existing(&mut self) -> WorkerResult<Option<CollectionHandle>> {
        if let Some(handle) = self.state.handle() {
            return Ok(Some(handle.clone()));
        }

        let found = self.uploader.find_collection(&self.meta.title).await?;
        if let Some(handle) = &found {
            info!("Found existing collection {}", handle);
            self.state = CollectionState::Established(handle.clone());
        }
        Ok(found)
    }

    /// Return the established handle, creating the collection with
    /// `first`'s output as its first part when there is none yet.
    pub async fn resolve_or_create(&mut self, first: &Record) -> WorkerResult<CollectionHandle> {
        if let Some(handle) = self.state.handle() {
            return Ok(handle.clone());
        }

        self.uploader
            .create_and_upload(&self.meta, &first.output)
            .await?;
        self.creates += 1;
        metrics::counter!("brecup_uploads_total", "kind" => "create").increment(1);

        if !self.propagation_delay.is_zero() {
            info!(
                "Waiting {:?} for collection '{}' to be available",
                self.propagation_delay, self.meta.title
            );
            tokio::time::sleep(self.propagation_delay).await;
        }

        let handle = self
            .uploader
            .find_collection(&self.meta.title)
            .await?
            .ok_or_else(|| {
                WorkerError::collection_resolution(format!(
                    "collection '{}' not listed after creation",
                    self.meta.title
                ))
            })?;

        info!("Got collection handle {}", handle);
        self.state = CollectionState::Established(handle.clone());
        Ok(handle)
    }
}
