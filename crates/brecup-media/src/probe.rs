//! FFprobe resolution lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::command::{CommandRunner, ExternalCommand};
use crate::error::{MediaError, MediaResult};

/// Resolution reported in dry-run mode.
pub const PLACEHOLDER_RESOLUTION: &str = "1920x1080";

/// Width and height of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Build the ffprobe invocation for `video`.
pub fn probe_command(video: &Path) -> ExternalCommand {
    ExternalCommand::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .path_arg(video)
}

/// Probe the resolution of a video file.
pub async fn probe_resolution(runner: &CommandRunner, video: impl AsRef<Path>) -> MediaResult<Resolution> {
    let video = video.as_ref();

    if !runner.is_dry_run() && !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    let output = runner
        .output(&probe_command(video), PLACEHOLDER_RESOLUTION)
        .await?;
    parse_resolution(&output)
}

/// Parse `WIDTHxHEIGHT` as printed by `-of csv=s=x:p=0`.
///
/// Some containers print a trailing separator or extra lines; only the
/// first line is considered.
pub fn parse_resolution(output: &str) -> MediaResult<Resolution> {
    let line = output.lines().next().unwrap_or("").trim().trim_end_matches('x');

    let (width, height) = line
        .split_once('x')
        .ok_or_else(|| MediaError::invalid_probe_output(output))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| MediaError::invalid_probe_output(output))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| MediaError::invalid_probe_output(output))?;

    if width == 0 || height == 0 {
        return Err(MediaError::invalid_probe_output(output));
    }

    Ok(Resolution { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!(
            parse_resolution("1920x1080").unwrap(),
            Resolution { width: 1920, height: 1080 }
        );
        assert_eq!(parse_resolution("1280x720x\n").unwrap().height, 720);
        assert!(parse_resolution("").is_err());
        assert!(parse_resolution("N/A").is_err());
        assert!(parse_resolution("0x0").is_err());
    }

    #[test]
    fn test_probe_command_line() {
        assert_eq!(
            probe_command(Path::new("/rec/a.flv")).display(),
            "ffprobe -v error -select_streams v:0 -show_entries stream=width,height -of csv=s=x:p=0 /rec/a.flv"
        );
    }

    #[tokio::test]
    async fn test_dry_run_returns_placeholder() {
        let runner = CommandRunner::dry_run();
        let res = probe_resolution(&runner, "/missing/video.flv").await.unwrap();
        assert_eq!(res.to_string(), PLACEHOLDER_RESOLUTION);
        assert_eq!(runner.journal().len(), 1);
    }
}
