//! External process layer for brecup.
//!
//! This crate provides:
//! - A dry-run aware command runner that journals every invocation
//! - FFmpeg command building and the per-device transcoder
//! - FFprobe resolution probing
//! - Danmaku XML to ASS overlay conversion
//! - Compute device enumeration

pub mod command;
pub mod danmaku;
pub mod devices;
pub mod error;
pub mod probe;
pub mod transcode;

pub use command::{CommandRunner, ExternalCommand, FfmpegCommand, OperationJournal};
pub use danmaku::{convert_danmaku, default_danmaku_path, overlay_path_for};
pub use devices::{enumerate_devices, parse_visible_devices};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_resolution, Resolution};
pub use transcode::{FfmpegTranscoder, Transcoder, DEVICE_ENV};
