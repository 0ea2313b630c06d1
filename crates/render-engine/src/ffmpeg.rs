//! FFmpeg/FFprobe media-transform backend.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use reelforge_audio_ai::command_exists;
use reelforge_common::config::RenderConfig;
use reelforge_common::error::{ReelError, ReelResult};
use reelforge_common::process::{output_with_timeout, CommandError};
use reelforge_media_model::{MediaKind, SourceMedia};

use crate::transform::{MediaTransform, TargetSize, TransformRequest, WAVEFORM_CANVAS};

/// Lines of ffmpeg stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 12;

/// Backend driving the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout: Duration::from_secs(RenderConfig::default().step_timeout_secs),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new().with_timeout(Duration::from_secs(config.step_timeout_secs))
    }

    /// Deadline for each ffmpeg/ffprobe invocation; the process is killed
    /// when it expires.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `ffprobe` can be found.
    pub fn probe_available(&self) -> bool {
        command_exists(&self.ffprobe)
    }

    async fn probe_duration(&self, path: &Path) -> ReelResult<f64> {
        let mut command = tokio::process::Command::new(&self.ffprobe);
        command
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null());
        let output = output_with_timeout(command, self.timeout)
            .await
            .map_err(|e| ReelError::source_unreadable(path, format!("ffprobe {e}")))?;

        if !output.status.success() {
            return Err(ReelError::source_unreadable(
                path,
                format!(
                    "ffprobe failed (status {}): {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| ReelError::source_unreadable(path, "could not determine media duration"))
    }
}

#[async_trait]
impl MediaTransform for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg)
    }

    async fn probe(&self, path: &Path) -> ReelResult<SourceMedia> {
        let kind = MediaKind::from_path(path).ok_or_else(|| {
            ReelError::unsupported(format!("unsupported media format: {}", path.display()))
        })?;
        if !path.is_file() {
            return Err(ReelError::source_unreadable(path, "file does not exist"));
        }

        let duration_secs = self.probe_duration(path).await?;
        tracing::debug!(path = %path.display(), duration_secs, ?kind, "Probed source");
        Ok(SourceMedia::new(path, duration_secs, kind))
    }

    async fn run(&self, request: &TransformRequest) -> ReelResult<()> {
        let args = build_ffmpeg_args(request);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let started = std::time::Instant::now();
        let mut command = tokio::process::Command::new(&self.ffmpeg);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let output = output_with_timeout(command, self.timeout).await.map_err(|e| {
            if let CommandError::TimedOut(_) = e {
                tracing::warn!(output = %request.output.display(), error = %e, "Killed ffmpeg");
            }
            ReelError::render_step("ffmpeg", format!("ffmpeg {e}"))
        })?;

        if !output.status.success() {
            return Err(ReelError::render_step(
                "ffmpeg",
                format!(
                    "ffmpeg failed (status {}): {}",
                    output.status,
                    stderr_tail(&String::from_utf8_lossy(&output.stderr))
                ),
            ));
        }

        tracing::debug!(
            output = %request.output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ffmpeg finished"
        );
        Ok(())
    }
}

/// Build the ffmpeg argument list for a request.
pub fn build_ffmpeg_args(request: &TransformRequest) -> Vec<String> {
    let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error", "-nostdin"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(start) = request.start_secs {
        args.push("-ss".to_string());
        args.push(format_secs(start));
    }
    args.push("-i".to_string());
    args.push(request.input.display().to_string());
    if let Some(window) = request.window_secs() {
        args.push("-t".to_string());
        args.push(format_secs(window));
    }

    if request.waveform {
        let (width, height) = match request.target {
            TargetSize::Fit { width, height } => (width, height),
            TargetSize::Source => WAVEFORM_CANVAS,
        };
        let mut graph = format!(
            "[0:a]showwaves=s={width}x{height}:mode=line:colors=0xFFFFFF:scale=sqrt[waves];\
             color=c=black:s={width}x{height}[bg];\
             [bg][waves]overlay=shortest=1"
        );
        if let Some(srt) = &request.burn_subtitles {
            graph.push(',');
            graph.push_str(&subtitles_filter(srt, request));
        }
        graph.push_str("[v]");
        args.extend(
            ["-filter_complex", graph.as_str(), "-map", "[v]", "-map", "0:a"]
                .iter()
                .map(|s| s.to_string()),
        );
    } else {
        let mut filters = Vec::new();
        if let TargetSize::Fit { width, height } = request.target {
            filters.push(letterbox_filter(width, height));
        }
        if let Some(srt) = &request.burn_subtitles {
            filters.push(subtitles_filter(srt, request));
        }
        if !filters.is_empty() {
            args.push("-vf".to_string());
            args.push(filters.join(","));
        }
    }

    args.extend(codec_args(request));
    args.push(request.output.display().to_string());
    args
}

/// Scale to fit inside `width`x`height` and pad the remainder with black.
pub fn letterbox_filter(width: u32, height: u32) -> String {
    format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,\
         pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1"
    )
}

fn subtitles_filter(srt: &Path, request: &TransformRequest) -> String {
    format!(
        "subtitles={}:force_style='{}'",
        escape_filter_path(srt),
        request.subtitle_style.force_style()
    )
}

/// Escape a path for use as a filter option value.
fn escape_filter_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace(',', "\\,")
}

fn codec_args(request: &TransformRequest) -> Vec<String> {
    let encode = &request.encode;
    vec![
        "-c:v".to_string(),
        encode.video_codec.clone(),
        "-preset".to_string(),
        encode.preset.clone(),
        "-crf".to_string(),
        encode.crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        encode.audio_codec.clone(),
        "-b:a".to_string(),
        encode.audio_bitrate.clone(),
        "-avoid_negative_ts".to_string(),
        "make_zero".to_string(),
        "-map_metadata".to_string(),
        "-1".to_string(),
        "-fflags".to_string(),
        "+bitexact".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
}

fn format_secs(secs: f64) -> String {
    format!("{:.3}", secs.max(0.0))
}

fn parse_duration(stdout: &str) -> Option<f64> {
    let duration = stdout.lines().next()?.trim().parse::<f64>().ok()?;
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
