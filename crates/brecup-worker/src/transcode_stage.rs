//! Device-bounded transcode worker pool.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument};

use brecup_media::Transcoder;
use brecup_models::{JobResult, Record};

use crate::devices::DevicePool;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RecordLogger;

/// Runs one worker per device; each worker takes the next record, leases a
/// device, transcodes, releases, and forwards the result.
pub struct TranscodeStage {
    transcoder: Arc<dyn Transcoder>,
    pool: DevicePool,
    log_dir: PathBuf,
}

impl TranscodeStage {
    pub fn new(transcoder: Arc<dyn Transcoder>, pool: DevicePool, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            transcoder,
            pool,
            log_dir: log_dir.into(),
        }
    }

    /// Number of concurrent workers (one per device).
    pub fn width(&self) -> usize {
        self.pool.capacity()
    }

    /// Transcode every record, sending each result downstream as soon as it
    /// finishes. Returns the number of records transcoded.
    pub async fn run(
        self,
        records: Vec<Record>,
        results: mpsc::UnboundedSender<JobResult>,
    ) -> WorkerResult<usize> {
        self.run_until(records, results, std::future::pending()).await
    }

    /// Like [`TranscodeStage::run`], but stops early once `cancel` resolves.
    ///
    /// On the first failure or on cancellation every remaining worker is
    /// aborted and awaited before returning, so their child processes have
    /// been killed and their leases released by the time this returns.
    pub async fn run_until<F>(
        self,
        records: Vec<Record>,
        results: mpsc::UnboundedSender<JobResult>,
        cancel: F,
    ) -> WorkerResult<usize>
    where
        F: Future<Output = ()>,
    {
        let total = records.len();
        let width = self.width();
        info!("Transcoding {} records on {} devices", total, width);

        let (queue_tx, queue_rx) = async_channel::unbounded();
        for record in records {
            queue_tx
                .try_send(record)
                .map_err(|e| WorkerError::task_failed(format!("record queue: {e}")))?;
        }
        queue_tx.close();

        let mut workers = JoinSet::new();
        for worker in 0..width {
            let queue = queue_rx.clone();
            let results = results.clone();
            let transcoder = Arc::clone(&self.transcoder);
            let pool = self.pool.clone();
            let log_dir = self.log_dir.clone();

            workers.spawn(async move {
                let mut done = 0usize;
                while let Ok(record) = queue.recv().await {
                    let result = transcode_one(transcoder.as_ref(), &pool, &log_dir, record).await?;
                    results
                        .send(result)
                        .map_err(|_| WorkerError::task_failed("upload lane closed"))?;
                    done += 1;
                }
                debug!(worker, done, "transcode worker drained");
                Ok::<usize, WorkerError>(done)
            });
        }
        drop(results);

        let mut cancel = std::pin::pin!(cancel);
        let mut transcoded = 0;
        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    None => break,
                    Some(Ok(Ok(done))) => transcoded += done,
                    Some(Ok(Err(e))) => return Err(shut_down(&mut workers, e).await),
                    Some(Err(e)) => {
                        let e = WorkerError::task_failed(format!("transcode worker: {e}"));
                        return Err(shut_down(&mut workers, e).await);
                    }
                },
                () = &mut cancel => {
                    let e = WorkerError::task_failed("transcode stage cancelled");
                    return Err(shut_down(&mut workers, e).await);
                }
            }
        }

        info!("Transcoded {} of {} records", transcoded, total);
        Ok(transcoded)
    }
}

/// Abort every worker and wait for them to be torn down.
async fn shut_down(workers: &mut JoinSet<WorkerResult<usize>>, cause: WorkerError) -> WorkerError {
    warn!(in_flight = workers.len(), "stopping transcode workers: {}", cause);
    workers.abort_all();
    while workers.join_next().await.is_some() {}
    cause
}

/// Transcode one record on a leased device.
///
/// The lease is released before the outcome is inspected, so the device
/// returns to the pool on success and failure alike.
pub async fn transcode_one(
    transcoder: &dyn Transcoder,
    pool: &DevicePool,
    log_dir: &Path,
    mut record: Record,
) -> WorkerResult<JobResult> {
    let lease = pool.try_acquire()?;
    let device = lease.device().clone();
    let logger = RecordLogger::new(&record, "transcode");

    logger.device_picked(&device);
    record.start_transcode(device.clone());

    let log_path = log_dir.join(record.log_file_name());
    logger.log_path(&log_path);

    let started = Instant::now();
    let outcome = transcoder
        .transcode(&record, &device, &log_path)
        .instrument(logger.create_span())
        .await;

    logger.device_released(&device);
    lease.release()?;

    let output = match outcome {
        Ok(output) => output,
        Err(e) => {
            metrics::counter!("brecup_transcode_failures_total").increment(1);
            logger.log_error(&e.to_string());
            return Err(e.into());
        }
    };

    metrics::counter!("brecup_transcodes_total").increment(1);
    logger.output_written(&output);
    record.output = output;
    record.finish_transcode();

    Ok(JobResult {
        record,
        device,
        log_path,
        elapsed: started.elapsed(),
    })
}
