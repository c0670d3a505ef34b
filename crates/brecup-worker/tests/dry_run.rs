//! End-to-end dry runs through the real command builders.

use brecup_media::CommandRunner;
use brecup_worker::{parse_batch_config, run_batch, WorkerConfig};

const BATCH: &str = r#"
output-dir: /data/clips
cookies: /secrets/cookies.json
title: "Stream highlights"
tid: 171
tag: "vod"
cover: /data/cover.jpg
records:
  - video: /rec/a.flv
    ss: "00:00:10"
    to: "00:10:00"
    title: "Part A"
  - video: /rec/b.flv
    ss: "0"
    to: "600"
    title: "Part B"
  - video: /rec/c.flv
    ss: "1:00"
    to: "2:00"
    title: "Part C"
"#;

async fn dry_run() -> (Vec<String>, brecup_worker::RunSummary) {
    let batch = parse_batch_config(BATCH).unwrap();
    let config = WorkerConfig::default().with_work_dir("/tmp/brecup-dry-run");
    let runner = CommandRunner::dry_run();

    let summary = run_batch(&batch, &config, runner.clone()).await.unwrap();
    (runner.journal().entries(), summary)
}

fn lines_starting<'a>(journal: &'a [String], prefix: &str) -> Vec<&'a String> {
    journal.iter().filter(|l| l.starts_with(prefix)).collect()
}

#[tokio::test]
async fn test_dry_run_scenario() {
    let (journal, summary) = dry_run().await;

    assert_eq!(summary.devices, 2);
    assert_eq!(summary.transcoded, 3);
    assert_eq!(summary.upload.creates, 1);
    assert_eq!(summary.upload.appends, 2);
    assert_eq!(summary.upload.handle.as_ref().map(|h| h.as_str()), Some("BV1234567"));

    // Two transcodes start on distinct devices; the third reuses the first
    // device released.
    let encodes = lines_starting(&journal, "CUDA_VISIBLE_DEVICES=");
    assert_eq!(encodes.len(), 3);
    assert!(encodes[0].starts_with("CUDA_VISIBLE_DEVICES=0 ffmpeg "));
    assert!(encodes[1].starts_with("CUDA_VISIBLE_DEVICES=1 ffmpeg "));
    assert!(encodes[2].starts_with("CUDA_VISIBLE_DEVICES=0 ffmpeg "));
    assert!(encodes[0].contains("> /tmp/brecup-dry-run/logs/000-part_a.log 2>&1"));

    let uploads = lines_starting(&journal, "biliup ");
    assert_eq!(uploads.len(), 4);
    assert!(uploads[0].contains(" upload --tid 171 --title 'Stream highlights' --tag vod --cover /data/cover.jpg /data/clips/a.flv"));
    assert!(uploads[1].ends_with(" list"));
    assert!(uploads[2].contains(" append -v BV1234567 --title 'Part B' /data/clips/b.flv"));
    assert!(uploads[3].contains(" append -v BV1234567 --title 'Part C' /data/clips/c.flv"));

    // Preparation happens before any device work.
    let first_encode = journal.iter().position(|l| l.starts_with("CUDA_VISIBLE_DEVICES=")).unwrap();
    let probes = journal.iter().position(|l| l == "nvidia-smi -L").unwrap();
    assert!(probes < first_encode);
    assert_eq!(lines_starting(&journal, "danmaku-factory ").len(), 3);
    assert!(journal.contains(&"mkdir -p /data/clips".to_string()));
    assert!(journal.contains(&"mkdir -p /tmp/brecup-dry-run/logs".to_string()));
}

#[tokio::test]
async fn test_dry_run_is_deterministic() {
    let (first, first_summary) = dry_run().await;
    let (second, second_summary) = dry_run().await;

    assert_eq!(first, second);
    assert_eq!(first_summary.upload, second_summary.upload);
    assert_ne!(first_summary.run_id, second_summary.run_id);
}

#[tokio::test]
async fn test_dry_run_honors_visible_devices() {
    let batch = parse_batch_config(BATCH).unwrap();
    let mut config = WorkerConfig::default();
    config.visible_devices = Some("CUDA_VISIBLE_DEVICES=5".to_string());
    let runner = CommandRunner::dry_run();

    let summary = run_batch(&batch, &config, runner.clone()).await.unwrap();

    assert_eq!(summary.devices, 1);
    let journal = runner.journal().entries();
    assert!(!journal.contains(&"nvidia-smi -L".to_string()));
    assert_eq!(lines_starting(&journal, "CUDA_VISIBLE_DEVICES=5 ffmpeg ").len(), 3);
}
