//! Wires the transcode stage into the upload lane.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use brecup_media::{enumerate_devices, CommandRunner, FfmpegTranscoder};
use brecup_models::{BatchConfig, Record, RunId};
use brecup_upload::BiliupClient;

use crate::collection::CollectionResolver;
use crate::config::WorkerConfig;
use crate::devices::DevicePool;
use crate::error::WorkerResult;
use crate::prepare::prepare_records;
use crate::transcode_stage::TranscodeStage;
use crate::upload_stage::{UploadReport, UploadStage};

/// Outcome of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub devices: usize,
    pub transcoded: usize,
    pub upload: UploadReport,
}

/// Runs both stages concurrently and returns once both have drained.
pub struct Orchestrator {
    transcode: TranscodeStage,
    upload: UploadStage,
}

impl Orchestrator {
    pub fn new(transcode: TranscodeStage, upload: UploadStage) -> Self {
        Self { transcode, upload }
    }

    /// Process `records` end to end.
    ///
    /// A transcode failure drops the upload in flight. An upload failure
    /// cancels the transcode stage and waits until its workers are gone.
    pub async fn run(self, records: Vec<Record>) -> WorkerResult<RunSummary> {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let devices = self.transcode.width();
        info!(run_id = %run_id, "Starting run with {} records", records.len());

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let transcode = self.transcode.run_until(records, results_tx, async move {
            let _ = cancel_rx.await;
        });
        let upload = self.upload.run(results_rx);
        tokio::pin!(transcode, upload);

        let (transcoded, upload) = tokio::select! {
            transcoded = &mut transcode => {
                // A transcode failure drops the upload lane mid-call.
                let transcoded = transcoded?;
                let report = (&mut upload).await?;
                (transcoded, report)
            }
            report = &mut upload => match report {
                Ok(report) => ((&mut transcode).await?, report),
                Err(e) => {
                    let _ = cancel_tx.send(());
                    if let Err(stopped) = (&mut transcode).await {
                        debug!("transcode stage stopped: {}", stopped);
                    }
                    return Err(e);
                }
            },
        };

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            devices,
            transcoded,
            upload,
        };
        info!(run_id = %summary.run_id, "Run complete");
        Ok(summary)
    }
}

/// Prepare a batch and run it with the external tools.
pub async fn run_batch(
    batch: &BatchConfig,
    config: &WorkerConfig,
    runner: CommandRunner,
) -> WorkerResult<RunSummary> {
    let records = prepare_records(batch, &runner).await?;

    let devices = enumerate_devices(&runner, config.visible_devices.as_deref()).await?;
    let pool = DevicePool::new(devices)?;
    runner.create_dir_all(config.log_dir()).await?;

    let uploader = Arc::new(BiliupClient::new(&batch.cookies, runner.clone()));
    uploader.check_credentials().await?;

    let delay = if runner.is_dry_run() {
        Duration::ZERO
    } else {
        config.propagation_delay
    };
    let mut resolver = CollectionResolver::new(uploader.clone(), batch.collection.clone(), delay);
    if batch.reuse_existing {
        resolver.lookup_existing().await?;
    }

    let transcoder = Arc::new(FfmpegTranscoder::new(runner.clone(), batch.encoding.clone()));
    let orchestrator = Orchestrator::new(
        TranscodeStage::new(transcoder, pool, config.log_dir()),
        UploadStage::new(uploader, resolver),
    );
    orchestrator.run(records).await
}
