//! Turns batch entries into schedulable records.

use std::path::Path;

use tracing::debug;

use brecup_media::{convert_danmaku, default_danmaku_path, CommandRunner};
use brecup_models::timestamp::format_seconds;
use brecup_models::{BatchConfig, Record};

use crate::error::{WorkerError, WorkerResult};

/// Build the record list for `batch`.
///
/// Overlays are generated first (one probe and one conversion per entry),
/// then the output directory is created and each record is pointed at
/// `output-dir/<video file name>`.
pub async fn prepare_records(batch: &BatchConfig, runner: &CommandRunner) -> WorkerResult<Vec<Record>> {
    let mut overlays = Vec::with_capacity(batch.records.len());
    for entry in &batch.records {
        let danmaku = entry
            .danmaku
            .clone()
            .unwrap_or_else(|| default_danmaku_path(&entry.video));
        overlays.push(convert_danmaku(runner, &entry.video, &danmaku).await?);
    }

    runner.create_dir_all(&batch.output_dir).await?;

    let mut records = Vec::with_capacity(batch.records.len());
    for (index, (entry, overlay)) in batch.records.iter().zip(overlays).enumerate() {
        let clip = entry
            .clip()
            .map_err(|e| WorkerError::config_error(format!("record {index}: {e}")))?;
        let output = output_path(&batch.output_dir, &entry.video)?;
        debug!(
            "Record {} '{}' ({}) -> {}",
            index,
            entry.title,
            format_seconds(clip.duration_secs()),
            output.display()
        );

        records.push(Record::new(index, &entry.title, &entry.video, overlay, clip, output));
    }

    Ok(records)
}

/// `output_dir/<file name of video>`.
pub fn output_path(output_dir: &Path, video: &Path) -> WorkerResult<std::path::PathBuf> {
    let name = video
        .file_name()
        .ok_or_else(|| WorkerError::config_error(format!("{} has no file name", video.display())))?;
    Ok(output_dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::config::parse_batch_config;

    const BATCH: &str = r#"
output-dir: /data/clips
cookies: cookies.json
title: "Highlights"
tid: 171
records:
  - video: /rec/a.flv
    ss: "0"
    to: "60"
    title: "A"
  - video: /rec/b.flv
    danmaku: /rec/b-prepared.ass
    ss: "10"
    to: "20"
    title: "B"
"#;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/data/clips"), Path::new("/rec/part 1.flv")).unwrap(),
            PathBuf::from("/data/clips/part 1.flv")
        );
        assert!(output_path(Path::new("/data/clips"), Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn test_prepare_records_dry_run() {
        let batch = parse_batch_config(BATCH).unwrap();
        let runner = CommandRunner::dry_run();

        let records = prepare_records(&batch, &runner).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].overlay, PathBuf::from("/rec/a.ass"));
        assert_eq!(records[0].output, PathBuf::from("/data/clips/a.flv"));
        assert_eq!(records[1].overlay, PathBuf::from("/rec/b-prepared.ass"));
        assert_eq!(records[1].index, 1);
        assert_eq!(records[1].clip.duration_secs(), 10.0);

        let journal = runner.journal().entries();
        assert_eq!(journal.len(), 3);
        assert!(journal[0].starts_with("ffprobe "));
        assert!(journal[1].starts_with("danmaku-factory "));
        assert_eq!(journal[2], "mkdir -p /data/clips");
    }
}
