//! Single-lane upload sequencer.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use brecup_models::{CollectionHandle, DeviceId, JobResult, Record};
use brecup_upload::CollectionUploader;

use crate::collection::CollectionResolver;
use crate::error::WorkerResult;
use crate::logging::RecordLogger;

/// One delivered record and how its transcode went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveredPart {
    pub title: String,
    /// Device that served the transcode
    pub device: DeviceId,
    pub log_path: PathBuf,
    pub transcode_secs: f64,
}

impl DeliveredPart {
    fn from_job(job: &JobResult) -> Self {
        Self {
            title: job.record.title.clone(),
            device: job.device.clone(),
            log_path: job.log_path.clone(),
            transcode_secs: job.elapsed.as_secs_f64(),
        }
    }
}

/// What the upload lane did during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadReport {
    /// Collection every record ended up in
    pub handle: Option<CollectionHandle>,
    pub creates: usize,
    pub appends: usize,
    /// Record titles in upload order
    pub delivered: Vec<String>,
    /// Per-record details, in the same order as `delivered`
    pub parts: Vec<DeliveredPart>,
}

/// Uploads transcoded records one at a time, in the order they arrive.
pub struct UploadStage {
    uploader: Arc<dyn CollectionUploader>,
    resolver: CollectionResolver,
}

impl UploadStage {
    pub fn new(uploader: Arc<dyn CollectionUploader>, resolver: CollectionResolver) -> Self {
        Self { uploader, resolver }
    }

    /// Drain `results` until every sender is gone.
    pub async fn run(mut self, mut results: mpsc::UnboundedReceiver<JobResult>) -> WorkerResult<UploadReport> {
        let mut report = UploadReport::default();

        while let Some(job) = results.recv().await {
            let part = DeliveredPart::from_job(&job);
            let record = self.deliver(job.record, &mut report).await?;
            report.delivered.push(record.title);
            report.parts.push(part);
        }

        report.creates = self.resolver.creates();
        report.handle = self.resolver.handle().cloned();
        info!(
            "Uploaded {} records ({} created, {} appended)",
            report.delivered.len(),
            report.creates,
            report.appends
        );
        Ok(report)
    }

    async fn deliver(&mut self, mut record: Record, report: &mut UploadReport) -> WorkerResult<Record> {
        let logger = RecordLogger::new(&record, "upload");

        let handle = match self.resolver.handle().cloned() {
            None => {
                let handle = self.resolver.resolve_or_create(&record).await?;
                logger.delivered("create", handle.as_str());
                handle
            }
            Some(handle) => {
                self.uploader
                    .append(&handle, &record.title, &record.output)
                    .await?;
                report.appends += 1;
                metrics::counter!("brecup_uploads_total", "kind" => "append").increment(1);
                logger.delivered("append", handle.as_str());
                handle
            }
        };

        debug_assert_eq!(self.resolver.handle(), Some(&handle));
        record.mark_delivered();
        Ok(record)
    }
}
