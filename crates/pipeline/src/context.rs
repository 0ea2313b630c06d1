//! Shared, read-only inputs of a run.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reelforge_audio_ai::{TranscriptionBackend, TranscriptionProvider};
use reelforge_common::config::AppConfig;
use reelforge_common::error::{ReelError, ReelResult};
use reelforge_common::retry::RetryPolicy;
use reelforge_highlight_ai::{HighlightSelector, SelectorBackend};
use reelforge_render_engine::{FfmpegBackend, MediaTransform, RenderSettings};

/// Per-run options. Defaults come from configuration; the CLI may override
/// any of them.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub out_root: PathBuf,
    pub desired_count: usize,
    /// Transcription language hint and highlight text language.
    pub language: Option<String>,
    pub confirm_copyright: bool,
    pub parallel_files: bool,
    pub file_workers: usize,
    pub render_workers: usize,
}

impl RunOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            out_root: config.output.out_dir.clone(),
            desired_count: config.highlights.default_count,
            language: config.transcription.language.clone(),
            confirm_copyright: false,
            parallel_files: config.output.parallel_files,
            file_workers: config.output.file_workers.max(1),
            render_workers: config.output.render_workers.max(1),
        }
    }

    /// Concurrent file pipelines: 1 in sequential mode.
    pub fn effective_file_workers(&self) -> usize {
        if self.parallel_files {
            self.file_workers.max(1)
        } else {
            1
        }
    }
}

/// Everything a file pipeline reads. Built once per run and shared by
/// `Arc`; nothing in it is mutated except the shutdown flag.
pub struct PipelineContext {
    pub config: Arc<AppConfig>,
    pub options: RunOptions,
    pub transcriber: Arc<dyn TranscriptionProvider>,
    pub selector: Arc<dyn HighlightSelector>,
    pub transform: Arc<dyn MediaTransform>,
    pub render_settings: Arc<RenderSettings>,
    pub retry: RetryPolicy,
    shutdown: Arc<AtomicBool>,
}

impl PipelineContext {
    pub fn new(
        config: Arc<AppConfig>,
        options: RunOptions,
        transcriber: Arc<dyn TranscriptionProvider>,
        selector: Arc<dyn HighlightSelector>,
        transform: Arc<dyn MediaTransform>,
    ) -> Self {
        Self {
            render_settings: Arc::new(RenderSettings::from_config(&config.video)),
            retry: RetryPolicy::from_config(&config.retry),
            config,
            options,
            transcriber,
            selector,
            transform,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the configured provider backends and the ffmpeg transform.
    pub fn from_config(config: Arc<AppConfig>, options: RunOptions) -> ReelResult<Self> {
        let transcriber = TranscriptionBackend::from_config(&config)?;
        let selector = SelectorBackend::from_config(&config)?;
        let transform = FfmpegBackend::from_config(&config.video);
        if !transform.is_available() {
            return Err(ReelError::config(
                "ffmpeg not found in PATH; install ffmpeg to render reels",
            ));
        }

        tracing::info!(
            transcriber = transcriber.name(),
            selector = selector.name(),
            transform = transform.name(),
            "Pipeline backends selected"
        );
        Ok(Self::new(
            config,
            options,
            Arc::new(transcriber),
            Arc::new(selector),
            Arc::new(transform),
        ))
    }

    /// Share an externally owned shutdown flag (e.g. set by a signal handler).
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
