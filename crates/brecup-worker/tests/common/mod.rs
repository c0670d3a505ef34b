//! Recording fakes for the transcoder and uploader seams.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use brecup_media::{MediaError, MediaResult, Transcoder};
use brecup_models::{ClipRange, CollectionHandle, CollectionMeta, DeviceId, Record};
use brecup_upload::{CollectionUploader, UploadError, UploadResult};

pub fn record(index: usize, title: &str) -> Record {
    let stem = title.to_lowercase().replace(' ', "-");
    Record::new(
        index,
        title,
        format!("/rec/{stem}.flv"),
        format!("/rec/{stem}.ass"),
        ClipRange::parse("0", "60").unwrap(),
        format!("/out/{stem}.flv"),
    )
}

pub fn meta() -> CollectionMeta {
    CollectionMeta {
        title: "Highlights".to_string(),
        tid: 171,
        tag: "vod".to_string(),
        cover: None,
    }
}

pub fn devices(n: usize) -> Vec<DeviceId> {
    (0..n).map(DeviceId::from_index).collect()
}

/// Poll `cond` until it holds, failing the test after a second.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

#[derive(Default)]
struct TranscoderState {
    events: Vec<String>,
    in_flight: HashSet<DeviceId>,
    peak_in_flight: usize,
    overlaps: usize,
    gates: HashMap<String, oneshot::Receiver<()>>,
    failing: HashSet<String>,
}

/// Transcoder that records starts and ends and can be held per record.
#[derive(Clone, Default)]
pub struct FakeTranscoder {
    state: Arc<Mutex<TranscoderState>>,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `title` inside its transcode until the returned sender fires.
    pub fn gate(&self, title: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().gates.insert(title.to_string(), rx);
        tx
    }

    pub fn fail(&self, title: &str) {
        self.state.lock().unwrap().failing.insert(title.to_string());
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn started(&self, title: &str) -> bool {
        let prefix = format!("start {title}@");
        self.events().iter().any(|e| e.starts_with(&prefix))
    }

    /// Device a record was started on.
    pub fn device_of(&self, title: &str) -> Option<String> {
        let prefix = format!("start {title}@");
        self.events()
            .iter()
            .find_map(|e| e.strip_prefix(&prefix).map(str::to_string))
    }

    pub fn peak_in_flight(&self) -> usize {
        self.state.lock().unwrap().peak_in_flight
    }

    /// Times a device was entered while another transcode already held it.
    pub fn overlaps(&self) -> usize {
        self.state.lock().unwrap().overlaps
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, record: &Record, device: &DeviceId, _log_path: &Path) -> MediaResult<PathBuf> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.events.push(format!("start {}@{}", record.title, device));
            if !state.in_flight.insert(device.clone()) {
                state.overlaps += 1;
            }
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight.len());
            state.gates.remove(&record.title)
        };

        match gate {
            Some(rx) => {
                let _ = rx.await;
            }
            None => tokio::task::yield_now().await,
        }

        let mut state = self.state.lock().unwrap();
        state.in_flight.remove(device);
        state.events.push(format!("end {}", record.title));

        if state.failing.contains(&record.title) {
            return Err(MediaError::command_failed(
                "ffmpeg",
                "exited with exit status: 1",
                None,
                Some(1),
            ));
        }
        Ok(record.output.clone())
    }
}

fn biliup_failure() -> MediaError {
    MediaError::command_failed("biliup", "exited with exit status: 1", None, Some(1))
}

#[derive(Default)]
struct UploaderState {
    events: Vec<String>,
    existing: Option<CollectionHandle>,
    created: bool,
    hide_created: bool,
    fail_creates: bool,
    fail_appends: bool,
}

/// Uploader that records every call and assigns `BV-fake` on create.
#[derive(Clone, Default)]
pub struct FakeUploader {
    state: Arc<Mutex<UploaderState>>,
}

impl FakeUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend a collection already exists before the run.
    pub fn with_existing(self, handle: &str) -> Self {
        self.state.lock().unwrap().existing = Some(CollectionHandle::new(handle));
        self
    }

    /// Never show the created collection in listings.
    pub fn hiding_created(self) -> Self {
        self.state.lock().unwrap().hide_created = true;
        self
    }

    /// Make every create fail as if biliup exited with status 1.
    pub fn failing_creates(self) -> Self {
        self.state.lock().unwrap().fail_creates = true;
        self
    }

    /// Make every append fail as if biliup exited with status 1.
    pub fn failing_appends(self) -> Self {
        self.state.lock().unwrap().fail_appends = true;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

#[async_trait]
impl CollectionUploader for FakeUploader {
    async fn create_and_upload(&self, meta: &CollectionMeta, file: &Path) -> UploadResult<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("create {} {}", meta.title, file.display()));
        if state.fail_creates {
            return Err(UploadError::CreateFailed(biliup_failure()));
        }
        state.created = true;
        Ok(())
    }

    async fn append(&self, handle: &CollectionHandle, title: &str, file: &Path) -> UploadResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .events
            .push(format!("append {} {} {}", handle, title, file.display()));
        if state.fail_appends {
            return Err(UploadError::append_failed(handle.as_str(), biliup_failure()));
        }
        Ok(())
    }

    async fn find_collection(&self, title: &str) -> UploadResult<Option<CollectionHandle>> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("list {title}"));
        if let Some(existing) = &state.existing {
            return Ok(Some(existing.clone()));
        }
        if state.created && !state.hide_created {
            return Ok(Some(CollectionHandle::new("BV-fake")));
        }
        Ok(None)
    }
}
