//! Transcode settings for the burn-in pass.

use serde::{Deserialize, Serialize};

/// Default hardware decode mode
pub const DEFAULT_HWACCEL: &str = "auto";
/// Default video codec (NVENC H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "h264_nvenc";
/// Audio is passed through untouched
pub const DEFAULT_AUDIO_CODEC: &str = "copy";
/// Default target bitrate
pub const DEFAULT_BITRATE: &str = "8192K";

/// Encoder settings applied to every record of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TranscodeSettings {
    /// `-hwaccel` value for decoding
    #[serde(default = "default_hwaccel")]
    pub hwaccel: String,

    /// Video codec (e.g., "h264_nvenc", "hevc_nvenc")
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Target bitrate passed to `-b`
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_hwaccel() -> String {
    DEFAULT_HWACCEL.to_string()
}
fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_bitrate() -> String {
    DEFAULT_BITRATE.to_string()
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            hwaccel: default_hwaccel(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            bitrate: default_bitrate(),
            extra_args: Vec::new(),
        }
    }
}

impl TranscodeSettings {
    /// Encoder arguments placed after the video filter.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b".to_string(),
            self.bitrate.clone(),
        ];
        args.extend(self.extra_args.clone());
        args
    }
}
