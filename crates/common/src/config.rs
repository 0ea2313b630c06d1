//! Application configuration.
//!
//! A single immutable [`AppConfig`] value is built once at startup and handed
//! to the run coordinator. Nothing in the workspace reads configuration from
//! global state after that point.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReelError, ReelResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output layout and concurrency.
    pub output: OutputConfig,

    /// Speech-to-text backend selection.
    pub transcription: TranscriptionConfig,

    /// Highlight selection backend and duration constraints.
    pub highlights: HighlightConfig,

    /// Rendering parameters for clips and variants.
    pub video: RenderConfig,

    /// Credentials and endpoints for hosted providers.
    pub api: ApiConfig,

    /// Retry policy for transient provider failures.
    pub retry: RetryConfig,

    /// Input gating.
    pub safety: SafetyConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Output root and concurrency tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory; each source gets `{out_dir}/{stem}/`.
    pub out_dir: PathBuf,

    /// Run file pipelines concurrently.
    pub parallel_files: bool,

    /// Max concurrent file pipelines when `parallel_files` is set.
    pub file_workers: usize,

    /// Max concurrent render jobs inside one file pipeline.
    pub render_workers: usize,
}

/// Transcription backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionProviderKind {
    /// Hosted Whisper API.
    #[serde(rename = "openai")]
    OpenAi,
    /// `whisper` executable on the local machine.
    LocalWhisper,
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub provider: TranscriptionProviderKind,

    /// Hosted model name.
    pub model: String,

    /// Local model size (tiny, base, small, medium, large).
    pub local_model: String,

    /// Local executable name or path.
    pub local_binary: String,

    /// Language hint (ISO 639-1). `None` lets the backend detect it.
    pub language: Option<String>,

    /// Deadline for one run of the local executable.
    pub local_timeout_secs: u64,
}

/// Highlight selection backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

/// Highlight selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub provider: SelectorProviderKind,

    /// Model name passed to the provider.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Highlights requested per file when the run does not override it.
    pub default_count: usize,

    /// Minimum accepted highlight length in seconds.
    pub min_duration: f64,

    /// Maximum accepted highlight length in seconds.
    pub max_duration: f64,
}

/// One output aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectFormat {
    /// Display name such as `9:16`.
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl AspectFormat {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    /// Filesystem-safe label: `9:16` becomes `9x16`.
    pub fn file_label(&self) -> String {
        self.name.replace([':', '/', '\\', ' '], "x")
    }
}

/// Rendering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Aspect-ratio variants produced for every highlight.
    pub formats: Vec<AspectFormat>,

    /// Burn subtitles into every variant.
    pub burn_subtitles: bool,

    pub codec: String,
    pub preset: String,
    pub crf: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,

    pub subtitle_font_size: u32,
    pub subtitle_font_color: String,
    pub subtitle_background: String,

    /// Deadline for one ffmpeg/ffprobe invocation.
    pub step_timeout_secs: u64,
}

/// Hosted provider credentials and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Exponential backoff policy for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// Input gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Refuse to process anything unless the run confirms copyright.
    pub require_copyright_confirmation: bool,

    /// Sources shorter than this (seconds) are skipped.
    pub min_file_duration: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("outputs"),
            parallel_files: false,
            file_workers: 4,
            render_workers: 2,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: TranscriptionProviderKind::OpenAi,
            model: "whisper-1".to_string(),
            local_model: "base".to_string(),
            local_binary: "whisper".to_string(),
            language: None,
            local_timeout_secs: 3600,
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            provider: SelectorProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            default_count: 5,
            min_duration: 6.0,
            max_duration: 60.0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            formats: vec![
                AspectFormat::new("1:1", 1080, 1080),
                AspectFormat::new("9:16", 1080, 1920),
            ],
            burn_subtitles: false,
            codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            subtitle_font_size: 24,
            subtitle_font_color: "&H00FFFFFF".to_string(),
            subtitle_background: "&H80000000".to_string(),
            step_timeout_secs: 900,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            anthropic_base_url: "https://api.anthropic.com/v1".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            require_copyright_confirmation: false,
            min_file_duration: 5.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the standard
    /// location is tried and defaults are used if it is missing or broken.
    /// API keys left empty are filled from the environment either way.
    pub fn load(path: Option<&Path>) -> ReelResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let config_path = config_file_path();
                if config_path.exists() {
                    match Self::from_file(&config_path) {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_keys();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without environment overrides.
    pub fn from_file(path: &Path) -> ReelResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReelError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| ReelError::config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Save config to the given path, creating parent directories.
    pub fn save(&self, path: &Path) -> ReelResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Fill empty API keys from `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`.
    pub fn apply_env_keys(&mut self) {
        fill_from_env(&mut self.api.openai_api_key, "OPENAI_API_KEY");
        fill_from_env(&mut self.api.anthropic_api_key, "ANTHROPIC_API_KEY");
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> ReelResult<()> {
        let h = &self.highlights;
        if !(h.min_duration > 0.0 && h.max_duration > 0.0) {
            return Err(ReelError::config(
                "highlight min_duration and max_duration must be positive",
            ));
        }
        if h.min_duration > h.max_duration {
            return Err(ReelError::config(format!(
                "highlight min_duration ({}) exceeds max_duration ({})",
                h.min_duration, h.max_duration
            )));
        }
        if self.output.file_workers == 0 || self.output.render_workers == 0 {
            return Err(ReelError::config("worker limits must be at least 1"));
        }
        if self.video.step_timeout_secs == 0 || self.transcription.local_timeout_secs == 0 {
            return Err(ReelError::config("process timeouts must be at least 1 second"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ReelError::config("retry.max_attempts must be at least 1"));
        }
        for format in &self.video.formats {
            if format.name.trim().is_empty() || format.width == 0 || format.height == 0 {
                return Err(ReelError::config(format!(
                    "invalid aspect format {:?}",
                    format
                )));
            }
        }
        Ok(())
    }
}

fn fill_from_env(slot: &mut Option<String>, var: &str) {
    let missing = slot.as_deref().map(str::trim).unwrap_or("").is_empty();
    if missing {
        *slot = std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelforge").join("config.json")
}
