//! External command builders and the dry-run aware runner.
//!
//! Every external tool (ffmpeg, ffprobe, danmaku-factory, nvidia-smi, biliup)
//! goes through [`CommandRunner`]. The runner echoes each command line,
//! appends it to an [`OperationJournal`], and in dry-run mode returns a
//! caller-supplied placeholder instead of spawning anything.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::process::Command;
use tracing::{debug, info};

use brecup_models::ClipRange;

use crate::error::{MediaError, MediaResult};

/// Lines of stderr kept in a failure message.
const STDERR_TAIL_LINES: usize = 20;

/// A fully specified external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    /// Redirect stdout and stderr to this file
    log_file: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            log_file: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Capture stdout and stderr into `path` instead of the parent's streams.
    pub fn log_to(mut self, path: impl AsRef<Path>) -> Self {
        self.log_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(String, String)] {
        &self.envs
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Render as a copy-pasteable shell line.
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = self
            .envs
            .iter()
            .map(|(k, v)| format!("{}={}", k, shell_quote(v)))
            .collect();
        parts.push(shell_quote(&self.program));
        parts.extend(self.args.iter().map(|a| shell_quote(a)));

        let mut line = parts.join(" ");
        if let Some(log) = &self.log_file {
            line.push_str(&format!(" > {} 2>&1", shell_quote(&log.to_string_lossy())));
        }
        line
    }
}

/// Quote an argument for display when it contains shell-significant characters.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Escape a path for use as a filter option value (`ass=<path>`).
pub fn escape_filter_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        if matches!(c, '\\' | '\'' | ':' | ',' | ';' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set hardware-accelerated decoding.
    pub fn hwaccel(self, mode: impl Into<String>) -> Self {
        self.input_arg("-hwaccel").input_arg(mode)
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Burn an ASS subtitle/overlay file into the picture.
    pub fn burn_subtitles(self, overlay: impl AsRef<Path>) -> Self {
        let filter = format!("ass={}", escape_filter_path(overlay.as_ref()));
        self.video_filter(filter)
    }

    /// Output-side clip window (`-ss`/`-to` after the input, frame accurate).
    pub fn clip(self, range: &ClipRange) -> Self {
        self.output_arg("-ss")
            .output_arg(range.start.clone())
            .output_arg("-to")
            .output_arg(range.end.clone())
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Turn into a runnable command.
    pub fn into_command(self) -> ExternalCommand {
        ExternalCommand::new("ffmpeg").args(self.build_args())
    }
}

/// Ordered record of every external operation a runner was asked to perform.
#[derive(Debug, Clone, Default)]
pub struct OperationJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OperationJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry.into());
    }

    /// Snapshot of all entries in submission order.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs external commands, or pretends to in dry-run mode.
///
/// Cheap to clone; clones share the journal.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    dry_run: bool,
    journal: OperationJournal,
}

impl CommandRunner {
    /// Create a runner that spawns real processes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner that only journals.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            journal: OperationJournal::new(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn journal(&self) -> &OperationJournal {
        &self.journal
    }

    fn announce(&self, line: String) {
        info!("{}", line);
        self.journal.record(line);
    }

    /// Run a command to completion, failing on non-zero exit.
    pub async fn run(&self, cmd: &ExternalCommand) -> MediaResult<()> {
        self.announce(cmd.display());
        if self.dry_run {
            return Ok(());
        }

        let mut process = self.prepare(cmd)?;

        match cmd.log_file() {
            Some(log_path) => {
                let log = File::create(log_path)?;
                let status = process
                    .stdout(Stdio::from(log.try_clone()?))
                    .stderr(Stdio::from(log))
                    .status()
                    .await?;

                if !status.success() {
                    return Err(MediaError::command_failed(
                        cmd.program(),
                        format!("exited with {} (log: {})", status, log_path.display()),
                        None,
                        status.code(),
                    ));
                }
            }
            None => {
                let output = process
                    .stdout(Stdio::null())
                    .stderr(Stdio::piped())
                    .output()
                    .await?;

                if !output.status.success() {
                    return Err(MediaError::command_failed(
                        cmd.program(),
                        format!("exited with {}", output.status),
                        Some(stderr_tail(&output.stderr)),
                        output.status.code(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Run a command and return its trimmed stdout.
    ///
    /// In dry-run mode `placeholder` is returned instead.
    pub async fn output(&self, cmd: &ExternalCommand, placeholder: &str) -> MediaResult<String> {
        self.announce(cmd.display());
        if self.dry_run {
            return Ok(placeholder.to_string());
        }

        let output = self
            .prepare(cmd)?
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::command_failed(
                cmd.program(),
                format!("exited with {}", output.status),
                Some(stderr_tail(&output.stderr)),
                output.status.code(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("{} returned {} bytes", cmd.program(), stdout.len());
        Ok(stdout)
    }

    /// Create a directory tree (journaled; skipped in dry-run).
    pub async fn create_dir_all(&self, dir: impl AsRef<Path>) -> MediaResult<()> {
        let dir = dir.as_ref();
        self.announce(format!("mkdir -p {}", shell_quote(&dir.to_string_lossy())));
        if self.dry_run {
            return Ok(());
        }
        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }

    fn prepare(&self, cmd: &ExternalCommand) -> MediaResult<Command> {
        which::which(cmd.program()).map_err(|_| MediaError::tool_not_found(cmd.program()))?;

        let mut process = Command::new(cmd.program());
        process
            .args(cmd.get_args())
            .envs(cmd.get_envs().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        Ok(process)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_command_builder() {
        let clip = ClipRange::parse("00:01:00", "00:02:00").unwrap();
        let args = FfmpegCommand::new("in.flv", "out.flv")
            .hwaccel("auto")
            .burn_subtitles("sub.ass")
            .output_args(["-c:v", "h264_nvenc"])
            .clip(&clip)
            .build_args();

        assert_eq!(
            args,
            vec![
                "-hwaccel", "auto", "-i", "in.flv", "-vf", "ass=sub.ass", "-c:v", "h264_nvenc",
                "-ss", "00:01:00", "-to", "00:02:00", "-y", "out.flv"
            ]
        );
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("/rec/a.ass")), "/rec/a.ass");
        assert_eq!(escape_filter_path(Path::new("C:/it's.ass")), r"C\:/it\'s.ass");
    }

    #[test]
    fn test_display_quotes_and_redirects() {
        let cmd = ExternalCommand::new("ffmpeg")
            .env("CUDA_VISIBLE_DEVICES", "1")
            .arg("-i")
            .arg("my video.flv")
            .log_to("/tmp/x.log");
        assert_eq!(
            cmd.display(),
            "CUDA_VISIBLE_DEVICES=1 ffmpeg -i 'my video.flv' > /tmp/x.log 2>&1"
        );
    }

    #[tokio::test]
    async fn test_dry_run_journals_without_spawning() {
        let runner = CommandRunner::dry_run();
        let cmd = ExternalCommand::new("definitely-not-installed-tool").arg("--flag");

        runner.run(&cmd).await.unwrap();
        let out = runner.output(&cmd, "placeholder").await.unwrap();
        runner.create_dir_all("/nonexistent/brecup/out").await.unwrap();

        assert_eq!(out, "placeholder");
        assert_eq!(
            runner.journal().entries(),
            vec![
                "definitely-not-installed-tool --flag",
                "definitely-not-installed-tool --flag",
                "mkdir -p /nonexistent/brecup/out",
            ]
        );
        assert!(!Path::new("/nonexistent/brecup/out").exists());
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let runner = CommandRunner::new();
        let cmd = ExternalCommand::new("definitely-not-installed-tool");
        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound(ref p) if p == "definitely-not-installed-tool"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_command_failed() {
        let runner = CommandRunner::new();
        let cmd = ExternalCommand::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        let err = runner.run(&cmd).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        match err {
            MediaError::CommandFailed { stderr, .. } => {
                assert_eq!(stderr.as_deref(), Some("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_log_file_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("job.log");
        let runner = CommandRunner::new();
        let cmd = ExternalCommand::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .log_to(&log);

        runner.run(&cmd).await.unwrap();

        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("out"));
        assert!(contents.contains("err"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_returns_trimmed_stdout() {
        let runner = CommandRunner::new();
        let cmd = ExternalCommand::new("sh").args(["-c", "printf ' 1920x1080 \\n'"]);
        assert_eq!(runner.output(&cmd, "unused").await.unwrap(), "1920x1080");
    }
}
