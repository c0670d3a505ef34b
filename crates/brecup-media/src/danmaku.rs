//! Danmaku (bullet comment) overlay generation.
//!
//! Recorder XML is converted to an ASS subtitle track sized to the video
//! with `danmaku-factory`; the ASS file is what the transcoder burns in.

use std::path::{Path, PathBuf};

use crate::command::{CommandRunner, ExternalCommand};
use crate::error::MediaResult;
use crate::probe::{probe_resolution, Resolution};

/// Danmaku source used when a record does not name one.
pub fn default_danmaku_path(video: &Path) -> PathBuf {
    video.with_extension("xml")
}

/// Where the converted overlay for `danmaku` is written.
pub fn overlay_path_for(danmaku: &Path) -> PathBuf {
    danmaku.with_extension("ass")
}

/// Whether `path` already is a prepared overlay and needs no conversion.
pub fn is_prepared_overlay(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ass"))
}

/// Build the danmaku-factory invocation.
pub fn conversion_command(xml: &Path, ass: &Path, resolution: &Resolution) -> ExternalCommand {
    ExternalCommand::new("danmaku-factory")
        .args(["--ignore-warnings", "-o", "ass"])
        .path_arg(ass)
        .arg("-i")
        .path_arg(xml)
        .arg("-r")
        .arg(resolution.to_string())
        .args(["-d", "-1", "-O", "127", "--showmsgbox", "FALSE"])
}

/// Produce the overlay for `video` from `danmaku`, returning its path.
///
/// The video is probed so the overlay matches its resolution. Prepared
/// `.ass` inputs are returned unchanged.
pub async fn convert_danmaku(
    runner: &CommandRunner,
    video: &Path,
    danmaku: &Path,
) -> MediaResult<PathBuf> {
    if is_prepared_overlay(danmaku) {
        return Ok(danmaku.to_path_buf());
    }

    let ass = overlay_path_for(danmaku);
    let resolution = probe_resolution(runner, video).await?;
    runner
        .run(&conversion_command(danmaku, &ass, &resolution))
        .await?;
    Ok(ass)
}
