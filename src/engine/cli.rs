//! yt-dlp based fetch engine

use super::parser::{OutputLine, PROGRESS_TEMPLATE, parse_line, summarize_failure};
use super::traits::{
    FetchEngine, FetchOutput, FetchProgress, FetchRequest, ProgressCallback, ProgressControl,
};
use crate::config::ToolsConfig;
use crate::error::EngineError;
use crate::types::FetchVariant;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Locations checked for ffmpeg when it is not on PATH
const FFMPEG_FALLBACK_DIRS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin"];

/// Lines of stderr kept for failure messages
const STDERR_TAIL: usize = 20;

/// Interval at which the last progress is re-reported while yt-dlp is silent
const HEARTBEAT: Duration = Duration::from_millis(500);

/// Fetch engine driving the external `yt-dlp` binary
///
/// Audio sub-operations extract the best audio stream and convert it to MP3
/// (which needs ffmpeg); video sub-operations download the best MP4 stream.
/// Output files are written as `<destination>/<title>.<ext>`.
///
/// # Examples
///
/// ```no_run
/// use redsea_dl::engine::YtDlpEngine;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let engine = YtDlpEngine::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
    user_agent: Option<String>,
}

impl YtDlpEngine {
    /// Create a new engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ffmpeg_path: None,
            user_agent: None,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build an engine from tool settings
    ///
    /// Returns `None` when no yt-dlp binary can be located.
    pub fn from_config(tools: &ToolsConfig) -> Option<Self> {
        let binary = locate_ytdlp(tools)?;
        Some(Self::new(binary).with_ffmpeg(locate_ffmpeg(tools)))
    }

    /// Pass an explicit ffmpeg location to yt-dlp
    pub fn with_ffmpeg(mut self, ffmpeg_path: Option<PathBuf>) -> Self {
        self.ffmpeg_path = ffmpeg_path;
        self
    }

    /// Send this User-Agent with every request
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Path of the yt-dlp binary
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Command-line arguments for one request
    pub(crate) fn build_args(&self, request: &FetchRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        match request.variant {
            FetchVariant::Audio => {
                args.extend(["-f", "bestaudio/best", "-x", "--audio-format", "mp3"].map(OsString::from));
                args.push("--audio-quality".into());
                args.push(format!("{}K", request.quality.kbps()).into());
            }
            FetchVariant::Video => {
                args.extend(["-f", "best[ext=mp4]/best"].map(OsString::from));
            }
        }

        args.push("-o".into());
        args.push(request.destination_dir.join("%(title)s.%(ext)s").into_os_string());

        let retries = request.retries.to_string();
        for flag in ["--retries", "--fragment-retries", "--extractor-retries"] {
            args.push(flag.into());
            args.push(retries.clone().into());
        }

        args.extend(["--newline", "--no-playlist", "--no-colors"].map(OsString::from));
        args.push("--progress-template".into());
        args.push(PROGRESS_TEMPLATE.into());

        if let Some(user_agent) = &self.user_agent {
            args.push("--user-agent".into());
            args.push(user_agent.into());
        }
        if let Some(ffmpeg) = &self.ffmpeg_path {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone().into_os_string());
        }

        args.push("--".into());
        args.push(request.source.clone().into());
        args
    }
}

/// Collected state while reading engine output
#[derive(Default)]
struct OutputState {
    files: Vec<PathBuf>,
    errors: Vec<String>,
    tail: VecDeque<String>,
    last_progress: Option<FetchProgress>,
}

impl OutputState {
    fn observe(&mut self, line: &str, on_progress: &ProgressCallback<'_>) -> ProgressControl {
        match parse_line(line) {
            OutputLine::Progress(progress) => {
                self.last_progress = Some(progress);
                return on_progress(progress);
            }
            OutputLine::Destination(path) => {
                if !self.files.contains(&path) {
                    self.files.push(path);
                }
            }
            OutputLine::Error(message) => {
                tracing::debug!(message = %message, "yt-dlp reported an error");
                self.errors.push(message);
            }
            OutputLine::Other => {}
        }
        ProgressControl::Continue
    }

    /// Re-report the last progress (0% before the first line)
    fn heartbeat(&self, on_progress: &ProgressCallback<'_>) -> ProgressControl {
        on_progress(self.last_progress.unwrap_or(FetchProgress {
            percent: 0.0,
            eta_secs: None,
        }))
    }

    fn remember(&mut self, line: &str) {
        if self.tail.len() == STDERR_TAIL {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }
}

#[async_trait]
impl FetchEngine for YtDlpEngine {
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: &ProgressCallback<'_>,
    ) -> Result<FetchOutput, EngineError> {
        tracing::debug!(
            source = %request.source,
            variant = %request.variant,
            destination = %request.destination_dir.display(),
            "Starting yt-dlp"
        );

        let mut child = Command::new(&self.binary_path)
            .args(self.build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Launch)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Failed("yt-dlp stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Failed("yt-dlp stderr unavailable".into()))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut state = OutputState::default();
        let mut stdout_done = false;
        let mut stderr_done = false;
        let mut aborted = false;
        let mut heartbeat =
            tokio::time::interval_at(tokio::time::Instant::now() + HEARTBEAT, HEARTBEAT);

        while !(stdout_done && stderr_done) {
            let control = tokio::select! {
                res = out_lines.next_line(), if !stdout_done => match res {
                    Ok(Some(line)) => state.observe(&line, on_progress),
                    Ok(None) => { stdout_done = true; ProgressControl::Continue }
                    Err(e) => {
                        tracing::warn!(error = %e, "Error reading yt-dlp stdout");
                        stdout_done = true;
                        ProgressControl::Continue
                    }
                },
                res = err_lines.next_line(), if !stderr_done => match res {
                    Ok(Some(line)) => {
                        state.remember(&line);
                        state.observe(&line, on_progress)
                    }
                    Ok(None) => { stderr_done = true; ProgressControl::Continue }
                    Err(e) => {
                        tracing::warn!(error = %e, "Error reading yt-dlp stderr");
                        stderr_done = true;
                        ProgressControl::Continue
                    }
                },
                _ = heartbeat.tick() => state.heartbeat(on_progress),
            };

            if control == ProgressControl::Abort {
                aborted = true;
                break;
            }
        }

        if aborted {
            tracing::debug!(source = %request.source, "Aborting yt-dlp");
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "Failed to kill yt-dlp process");
            }
            let _ = child.wait().await;
            return Err(EngineError::Aborted);
        }

        let status = child.wait().await.map_err(EngineError::Launch)?;
        if status.success() {
            Ok(FetchOutput { files: state.files })
        } else {
            let message = summarize_failure(&state.errors, &state.tail)
                .unwrap_or_else(|| format!("yt-dlp exited with {status}"));
            Err(EngineError::Failed(message))
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Locate yt-dlp: explicit path first, then PATH if allowed
pub fn locate_ytdlp(tools: &ToolsConfig) -> Option<PathBuf> {
    if let Some(path) = &tools.ytdlp_path {
        return Some(path.clone());
    }
    if tools.search_path {
        return which::which("yt-dlp").ok();
    }
    None
}

/// Locate ffmpeg: explicit path, then PATH if allowed, then well-known install locations
pub fn locate_ffmpeg(tools: &ToolsConfig) -> Option<PathBuf> {
    if let Some(path) = &tools.ffmpeg_path {
        return Some(path.clone());
    }
    if tools.search_path
        && let Ok(path) = which::which("ffmpeg")
    {
        return Some(path);
    }
    FFMPEG_FALLBACK_DIRS
        .iter()
        .map(|dir| Path::new(dir).join("ffmpeg"))
        .find(|candidate| candidate.is_file())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AudioQuality;

    #[test]
    fn stderr_tail_keeps_only_latest_lines() {
        let mut state = OutputState::default();
        for n in 0..STDERR_TAIL + 5 {
            state.remember(&format!("line {n}"));
        }
        assert_eq!(state.tail.len(), STDERR_TAIL);
        assert_eq!(state.tail.front().map(String::as_str), Some("line 5"));
        assert_eq!(
            summarize_failure(&state.errors, &state.tail),
            Some(format!("line {}", STDERR_TAIL + 4))
        );
    }

    fn request(variant: FetchVariant) -> FetchRequest {
        FetchRequest {
            source: "https://youtu.be/abc".into(),
            title: "Song".into(),
            destination_dir: PathBuf::from("/tmp/out"),
            variant,
            quality: AudioQuality::Kbps320,
            retries: 3,
        }
    }

    fn args_of(engine: &YtDlpEngine, variant: FetchVariant) -> Vec<String> {
        engine
            .build_args(&request(variant))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn audio_args_request_mp3_at_bitrate() {
        let args = args_of(&YtDlpEngine::new("yt-dlp".into()), FetchVariant::Audio);
        assert!(args.contains(&"-x".to_string()));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("320K"));
        assert_eq!(value_after(&args, "-f"), Some("bestaudio/best"));
    }

    #[test]
    fn video_args_request_mp4_without_extraction() {
        let args = args_of(&YtDlpEngine::new("yt-dlp".into()), FetchVariant::Video);
        assert_eq!(value_after(&args, "-f"), Some("best[ext=mp4]/best"));
        assert!(!args.contains(&"-x".to_string()));
    }

    #[test]
    fn common_args_carry_template_retries_and_source_last() {
        let engine = YtDlpEngine::new("yt-dlp".into())
            .with_user_agent("agent/1.0")
            .with_ffmpeg(Some(PathBuf::from("/opt/ffmpeg")));
        let args = args_of(&engine, FetchVariant::Audio);

        assert_eq!(value_after(&args, "-o"), Some("/tmp/out/%(title)s.%(ext)s"));
        assert_eq!(value_after(&args, "--retries"), Some("3"));
        assert_eq!(value_after(&args, "--fragment-retries"), Some("3"));
        assert_eq!(value_after(&args, "--user-agent"), Some("agent/1.0"));
        assert_eq!(value_after(&args, "--ffmpeg-location"), Some("/opt/ffmpeg"));
        assert_eq!(value_after(&args, "--progress-template"), Some(PROGRESS_TEMPLATE));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
        assert_eq!(args[args.len() - 2], "--");
    }

    #[test]
    fn explicit_tool_paths_win() {
        let tools = ToolsConfig {
            ytdlp_path: Some(PathBuf::from("/custom/yt-dlp")),
            ffmpeg_path: Some(PathBuf::from("/custom/ffmpeg")),
            search_path: false,
        };
        assert_eq!(locate_ytdlp(&tools), Some(PathBuf::from("/custom/yt-dlp")));
        assert_eq!(locate_ffmpeg(&tools), Some(PathBuf::from("/custom/ffmpeg")));

        let engine = YtDlpEngine::from_config(&tools).unwrap();
        assert_eq!(engine.binary_path(), Path::new("/custom/yt-dlp"));
    }

    #[test]
    fn no_search_and_no_path_means_no_engine() {
        let tools = ToolsConfig {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: false,
        };
        assert!(locate_ytdlp(&tools).is_none());
        assert!(YtDlpEngine::from_config(&tools).is_none());
    }

    #[test]
    fn from_path_consistency_with_which_crate() {
        assert_eq!(
            which::which("yt-dlp").is_ok(),
            YtDlpEngine::from_path().is_some(),
            "from_path() should return Some if and only if which::which() succeeds"
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let engine = YtDlpEngine::new(PathBuf::from("/nonexistent/yt-dlp-binary-xyz"));
        let result = engine
            .fetch(&request(FetchVariant::Audio), &|_| ProgressControl::Continue)
            .await;
        assert!(matches!(result, Err(EngineError::Launch(_))));
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::sync::Mutex;

        /// Write a shell script standing in for yt-dlp
        fn fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("yt-dlp");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn reports_progress_and_destination() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_ytdlp(
                dir.path(),
                "echo '[redsea]  10.0% 5'\n\
                 echo '[ExtractAudio] Destination: /tmp/out/Song.mp3'\n\
                 echo '[redsea] 100.0% NA'",
            );
            let engine = YtDlpEngine::new(script);
            let seen = Mutex::new(Vec::new());

            let output = engine
                .fetch(&request(FetchVariant::Audio), &|p| {
                    seen.lock().unwrap().push(p.percent);
                    ProgressControl::Continue
                })
                .await
                .unwrap();

            assert_eq!(*seen.lock().unwrap(), vec![10.0, 100.0]);
            assert_eq!(output.files, vec![PathBuf::from("/tmp/out/Song.mp3")]);
        }

        #[tokio::test]
        async fn nonzero_exit_surfaces_error_line() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_ytdlp(
                dir.path(),
                "echo 'ERROR: [youtube] abc: Video unavailable' >&2\nexit 1",
            );
            let engine = YtDlpEngine::new(script);

            match engine
                .fetch(&request(FetchVariant::Video), &|_| ProgressControl::Continue)
                .await
            {
                Err(EngineError::Failed(message)) => {
                    assert_eq!(message, "[youtube] abc: Video unavailable")
                }
                other => panic!("expected Failed error, got: {:?}", other),
            }
        }

        #[tokio::test]
        async fn abort_from_callback_kills_the_process() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_ytdlp(dir.path(), "echo '[redsea]  1.0% 100'\nsleep 30");
            let engine = YtDlpEngine::new(script);

            let started = std::time::Instant::now();
            let result = engine
                .fetch(&request(FetchVariant::Audio), &|_| ProgressControl::Abort)
                .await;

            assert!(matches!(result, Err(EngineError::Aborted)));
            assert!(
                started.elapsed() < std::time::Duration::from_secs(10),
                "abort must not wait for the process to finish"
            );
        }

        #[tokio::test]
        async fn silent_process_still_polls_callback() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_ytdlp(dir.path(), "sleep 30");
            let engine = YtDlpEngine::new(script);
            let polls = Mutex::new(0);

            let result = engine
                .fetch(&request(FetchVariant::Audio), &|p| {
                    assert_eq!(p.percent, 0.0);
                    *polls.lock().unwrap() += 1;
                    ProgressControl::Abort
                })
                .await;

            assert!(matches!(result, Err(EngineError::Aborted)));
            assert_eq!(*polls.lock().unwrap(), 1);
        }
    }
}
