//! Transcription providers.
//!
//! Two Whisper backends behind one contract: the hosted OpenAI API and the
//! `whisper` executable on the local machine. The backend is chosen once from
//! configuration when the pipeline is built.
//!
//! A provider performs exactly one external call per `transcribe`; retries
//! are applied by the caller.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};

use reelforge_common::config::{AppConfig, TranscriptionProviderKind};
use reelforge_common::error::{ReelError, ReelResult};
use reelforge_common::http::{build_client, classify_transport, ensure_success};
use reelforge_common::process::{output_with_timeout, CommandError};
use reelforge_media_model::{SourceMedia, Transcript, TranscriptSegment};

/// Speech-to-text capability.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Transcribe the whole source.
    async fn transcribe(
        &self,
        media: &SourceMedia,
        language_hint: Option<&str>,
    ) -> ReelResult<Transcript>;
}

/// Whisper model size for the local backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhisperModel {
    /// Fastest, least accurate (~39 MB).
    Tiny,
    /// Good balance of speed and accuracy (~142 MB).
    Base,
    /// Better accuracy, slower (~466 MB).
    Small,
    /// High accuracy (~1.5 GB).
    Medium,
    /// Best accuracy, slowest (~2.9 GB).
    Large,
}

impl WhisperModel {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tiny" => Some(WhisperModel::Tiny),
            "base" => Some(WhisperModel::Base),
            "small" => Some(WhisperModel::Small),
            "medium" => Some(WhisperModel::Medium),
            "large" => Some(WhisperModel::Large),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "tiny",
            WhisperModel::Base => "base",
            WhisperModel::Small => "small",
            WhisperModel::Medium => "medium",
            WhisperModel::Large => "large",
        }
    }
}

/// Whisper JSON payload. Both the `verbose_json` API response and the local
/// CLI's `--output_format json` file have this shape.
#[derive(Debug, Clone, Deserialize)]
struct WhisperPayload {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Convert a Whisper payload into a transcript.
///
/// Without segments but with text, the text becomes one segment spanning the
/// whole source.
fn payload_to_transcript(
    payload: WhisperPayload,
    language_hint: Option<&str>,
    duration_secs: f64,
) -> Transcript {
    let language = payload
        .language
        .filter(|l| !l.trim().is_empty())
        .or_else(|| language_hint.map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    let mut segments: Vec<TranscriptSegment> = payload
        .segments
        .into_iter()
        .map(|s| TranscriptSegment::new(s.start, s.end, s.text.trim()))
        .collect();

    if segments.is_empty() && !payload.text.trim().is_empty() {
        segments.push(TranscriptSegment::new(0.0, duration_secs, payload.text.trim()));
    }

    Transcript::new(language, segments)
}

fn parse_payload(provider: &str, raw: &[u8]) -> ReelResult<WhisperPayload> {
    serde_json::from_slice(raw)
        .map_err(|e| ReelError::invalid_response(provider, format!("malformed transcription: {e}")))
}

/// Hosted Whisper via the OpenAI audio transcription endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiWhisper {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiWhisper {
    pub const NAME: &'static str = "openai-whisper";

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> ReelResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ReelError::unavailable(
                Self::NAME,
                "OpenAI API key not found; set OPENAI_API_KEY or api.openai_api_key",
            ));
        }
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl TranscriptionProvider for OpenAiWhisper {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn transcribe(
        &self,
        media: &SourceMedia,
        language_hint: Option<&str>,
    ) -> ReelResult<Transcript> {
        tracing::info!(
            path = %media.path().display(),
            model = %self.model,
            "Transcribing with hosted Whisper"
        );

        let bytes = tokio::fs::read(media.path())
            .await
            .map_err(|e| ReelError::source_unreadable(media.path(), e.to_string()))?;
        let file_name = media
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));
        if let Some(language) = language_hint {
            form = form.text("language", language.to_string());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_transport(Self::NAME, e))?;
        let response = ensure_success(Self::NAME, response).await?;
        let raw = response
            .bytes()
            .await
            .map_err(|e| classify_transport(Self::NAME, e))?;

        let payload = parse_payload(Self::NAME, &raw)?;
        Ok(payload_to_transcript(
            payload,
            language_hint,
            media.duration_secs(),
        ))
    }
}

/// Local Whisper through the `whisper` command-line tool.
#[derive(Debug, Clone)]
pub struct LocalWhisper {
    binary: String,
    model: WhisperModel,
    scratch_dir: PathBuf,
    timeout: Duration,
}

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

impl LocalWhisper {
    pub const NAME: &'static str = "local-whisper";

    pub fn new(binary: impl Into<String>, model: WhisperModel) -> Self {
        Self {
            binary: binary.into(),
            model,
            scratch_dir: std::env::temp_dir(),
            timeout: Duration::from_secs(3600),
        }
    }

    /// Deadline for one run of the executable; the process is killed when
    /// it expires.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory under which per-call scratch directories are created.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Check if the executable can be found.
    pub fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn build_args(&self, input: &Path, output_dir: &Path, language_hint: Option<&str>) -> Vec<String> {
        let mut args = vec![
            input.display().to_string(),
            "--model".to_string(),
            self.model.as_str().to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.display().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ];
        if let Some(language) = language_hint {
            args.push("--language".to_string());
            args.push(language.to_string());
        }
        args
    }

    fn scratch_path(&self, media: &SourceMedia) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir.join(format!(
            "reelforge-whisper-{}-{}-{n}",
            std::process::id(),
            media.stem()
        ))
    }
}

#[async_trait]
impl TranscriptionProvider for LocalWhisper {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn transcribe(
        &self,
        media: &SourceMedia,
        language_hint: Option<&str>,
    ) -> ReelResult<Transcript> {
        let scratch = self.scratch_path(media);
        tokio::fs::create_dir_all(&scratch).await?;

        tracing::info!(
            path = %media.path().display(),
            model = self.model.as_str(),
            "Transcribing with local Whisper"
        );

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .args(self.build_args(media.path(), &scratch, language_hint))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let output = output_with_timeout(command, self.timeout).await;

        let result = match output {
            Ok(output) if output.status.success() => {
                let json_path = scratch.join(format!("{}.json", media.stem()));
                match tokio::fs::read(&json_path).await {
                    Ok(raw) => parse_payload(Self::NAME, &raw).map(|payload| {
                        payload_to_transcript(payload, language_hint, media.duration_secs())
                    }),
                    Err(e) => Err(ReelError::invalid_response(
                        Self::NAME,
                        format!("missing output {}: {e}", json_path.display()),
                    )),
                }
            }
            Ok(output) => Err(ReelError::unavailable(
                Self::NAME,
                format!(
                    "whisper exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            )),
            Err(CommandError::Spawn(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReelError::unavailable(
                    Self::NAME,
                    format!("'{}' not found in PATH (pip install openai-whisper)", self.binary),
                ))
            }
            Err(e @ CommandError::Spawn(_)) => {
                Err(ReelError::unavailable(Self::NAME, format!("whisper {e}")))
            }
            Err(e @ CommandError::TimedOut(_)) => {
                tracing::warn!(path = %media.path().display(), "Local Whisper timed out");
                Err(ReelError::timeout(Self::NAME, format!("whisper {e}")))
            }
        };

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            tracing::debug!(error = %e, path = %scratch.display(), "Failed to remove whisper scratch dir");
        }
        result
    }
}

/// Transcription backend selected from configuration.
#[derive(Debug, Clone)]
pub enum TranscriptionBackend {
    OpenAi(OpenAiWhisper),
    Local(LocalWhisper),
}

impl TranscriptionBackend {
    pub fn from_config(config: &AppConfig) -> ReelResult<Self> {
        let t = &config.transcription;
        match t.provider {
            TranscriptionProviderKind::OpenAi => Ok(Self::OpenAi(OpenAiWhisper::new(
                config.api.openai_api_key.clone().unwrap_or_default(),
                config.api.openai_base_url.clone(),
                t.model.clone(),
                config.api.request_timeout_secs,
            )?)),
            TranscriptionProviderKind::LocalWhisper => {
                let model = WhisperModel::parse(&t.local_model).ok_or_else(|| {
                    ReelError::config(format!("unknown local whisper model '{}'", t.local_model))
                })?;
                let local = LocalWhisper::new(t.local_binary.clone(), model)
                    .with_timeout(Duration::from_secs(t.local_timeout_secs));
                if !local.is_available() {
                    tracing::warn!(binary = %t.local_binary, "Local whisper executable not found in PATH");
                }
                Ok(Self::Local(local))
            }
        }
    }
}

#[async_trait]
impl TranscriptionProvider for TranscriptionBackend {
    fn name(&self) -> &str {
        match self {
            Self::OpenAi(p) => p.name(),
            Self::Local(p) => p.name(),
        }
    }

    async fn transcribe(
        &self,
        media: &SourceMedia,
        language_hint: Option<&str>,
    ) -> ReelResult<Transcript> {
        match self {
            Self::OpenAi(p) => p.transcribe(media, language_hint).await,
            Self::Local(p) => p.transcribe(media, language_hint).await,
        }
    }
}

/// Whether `binary` resolves to an executable.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
