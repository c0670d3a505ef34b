//! Overlay burn-in and clipping on a single compute device.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use brecup_models::{DeviceId, Record, TranscodeSettings};

use crate::command::{CommandRunner, ExternalCommand, FfmpegCommand};
use crate::error::MediaResult;

/// Environment variable that pins a child process to one device.
pub const DEVICE_ENV: &str = "CUDA_VISIBLE_DEVICES";

/// A transcode operation bound to one device.
///
/// Implementations must not touch any device other than `device`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Burn `record.overlay` into `record.video`, cut to `record.clip`,
    /// and write `record.output`. Tool output goes to `log_path`.
    async fn transcode(
        &self,
        record: &Record,
        device: &DeviceId,
        log_path: &Path,
    ) -> MediaResult<PathBuf>;
}

/// FFmpeg/NVENC transcoder.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    runner: CommandRunner,
    settings: TranscodeSettings,
}

impl FfmpegTranscoder {
    pub fn new(runner: CommandRunner, settings: TranscodeSettings) -> Self {
        Self { runner, settings }
    }
}

/// Build the full ffmpeg invocation for one record on one device.
pub fn build_command(
    record: &Record,
    device: &DeviceId,
    settings: &TranscodeSettings,
    log_path: &Path,
) -> ExternalCommand {
    FfmpegCommand::new(&record.video, &record.output)
        .hwaccel(settings.hwaccel.clone())
        .burn_subtitles(&record.overlay)
        .output_args(settings.to_ffmpeg_args())
        .clip(&record.clip)
        .into_command()
        .env(DEVICE_ENV, device.as_str())
        .log_to(log_path)
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        record: &Record,
        device: &DeviceId,
        log_path: &Path,
    ) -> MediaResult<PathBuf> {
        let cmd = build_command(record, device, &self.settings, log_path);
        self.runner.run(&cmd).await?;

        // Nothing ran; give the other workers a turn so dry runs still
        // interleave like real ones.
        if self.runner.is_dry_run() {
            tokio::task::yield_now().await;
        }

        Ok(record.output.clone())
    }
}
