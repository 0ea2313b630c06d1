//! The per-file pipeline state machine.
//!
//! ```text
//! Discovered → Transcribing → Selecting → Validating → Rendering → Completed
//!      │             │             │                       │
//!      └─────────────┴─────────────┴───────────────────────┴──► Failed
//! ```
//!
//! Input gates (copyright confirmation, minimum duration) report the file as
//! skipped before any provider is called. Once render jobs start the pipeline
//! always completes; individual render failures only make it partial.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use reelforge_audio_ai::TranscriptionProvider;
use reelforge_common::error::ReelError;
use reelforge_common::retry::with_retry;
use reelforge_highlight_ai::{HighlightSelector, SelectionConstraints};
use reelforge_media_model::{
    source_stem, FileReport, Highlight, HighlightCandidate, Manifest, PipelineStage,
    RenderManifestEntry, RenderStep, SourceMedia, Transcript, MANIFEST_FILE_NAME,
};
use reelforge_processing_core::{
    snap_to_segments, HighlightValidator, ValidationConstraints, DEFAULT_SNAP_TOLERANCE_SECS,
};
use reelforge_render_engine::{highlight_output_folder, RenderJob};

use crate::context::PipelineContext;

pub const COPYRIGHT_SKIP_REASON: &str = "copyright confirmation required";

/// Output directory of one source: `{out_root}/{source_stem}`.
pub fn file_output_dir(out_root: &Path, source: &Path) -> PathBuf {
    out_root.join(source_stem(source))
}

/// Why a pipeline stopped before completing.
enum Halt {
    Skipped(String),
    Failed(ReelError),
}

impl From<ReelError> for Halt {
    fn from(e: ReelError) -> Self {
        Halt::Failed(e)
    }
}

/// Pipeline for one input file.
pub struct FilePipeline {
    source: PathBuf,
    ctx: Arc<PipelineContext>,
    stage: PipelineStage,
}

impl FilePipeline {
    pub fn new(source: impl Into<PathBuf>, ctx: Arc<PipelineContext>) -> Self {
        Self {
            source: source.into(),
            ctx,
            stage: PipelineStage::Discovered,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Run to a terminal state. Never fails: every outcome is a report.
    pub async fn run(mut self) -> FileReport {
        let started = Instant::now();
        tracing::info!(source = %self.source.display(), "Processing file");

        let report = match self.execute().await {
            Ok(report) => {
                self.transition(PipelineStage::Completed);
                report
            }
            Err(Halt::Skipped(reason)) => {
                tracing::info!(source = %self.source.display(), reason = %reason, "Skipping file");
                FileReport::skipped(&self.source, reason)
            }
            Err(Halt::Failed(e)) => {
                let stage = self.stage;
                self.transition(PipelineStage::Failed);
                tracing::error!(
                    source = %self.source.display(),
                    stage = stage.as_str(),
                    kind = e.kind(),
                    error = %e,
                    "File pipeline failed"
                );
                FileReport::failed(&self.source, stage, e)
            }
        };

        report.with_elapsed(started.elapsed().as_secs_f64())
    }

    async fn execute(&mut self) -> Result<FileReport, Halt> {
        let ctx = Arc::clone(&self.ctx);

        if ctx.config.safety.require_copyright_confirmation && !ctx.options.confirm_copyright {
            return Err(Halt::Skipped(COPYRIGHT_SKIP_REASON.to_string()));
        }
        self.check_shutdown()?;

        let media = ctx.transform.probe(&self.source).await?;
        let min_duration = ctx.config.safety.min_file_duration;
        if media.duration_secs() < min_duration {
            return Err(Halt::Skipped(format!(
                "too short ({:.1}s < {:.1}s minimum)",
                media.duration_secs(),
                min_duration
            )));
        }
        let media = Arc::new(media);

        self.transition(PipelineStage::Transcribing);
        self.check_shutdown()?;
        let transcript = Arc::new(self.transcribe(&ctx, &media).await?);

        self.transition(PipelineStage::Selecting);
        self.check_shutdown()?;
        let candidates = self.select(&ctx, &transcript).await?;

        self.transition(PipelineStage::Validating);
        let candidates = snap_to_segments(candidates, &transcript, DEFAULT_SNAP_TOLERANCE_SECS);
        let constraints =
            ValidationConstraints::from_config(&ctx.config.highlights, ctx.options.desired_count);
        let (highlights, stats) =
            HighlightValidator::new(constraints).validate_with_stats(candidates, media.duration_secs());
        tracing::info!(
            source = %self.source.display(),
            received = stats.received,
            accepted = stats.accepted,
            rejected_overlap = stats.overlap,
            rejected_bounds = stats.invalid_span + stats.too_short + stats.too_long,
            "Validated highlights"
        );
        if highlights.is_empty() {
            tracing::info!(source = %self.source.display(), "No highlights found");
        }

        self.transition(PipelineStage::Rendering);
        self.check_shutdown()?;
        let out_dir = file_output_dir(&ctx.options.out_root, &self.source);
        std::fs::create_dir_all(&out_dir).map_err(ReelError::from)?;

        let manifest = render_all(&ctx, media, transcript, highlights, &out_dir).await;
        let manifest_path = out_dir.join(MANIFEST_FILE_NAME);
        manifest
            .save(&manifest_path)
            .map_err(|e| ReelError::Other(e.into()))?;
        tracing::info!(
            manifest = %manifest_path.display(),
            rendered = manifest.success_count(),
            total = manifest.len(),
            "Manifest written"
        );

        Ok(FileReport::completed(&self.source, &out_dir, &manifest_path, &manifest))
    }

    async fn transcribe(&self, ctx: &PipelineContext, media: &SourceMedia) -> Result<Transcript, ReelError> {
        let transcriber: &dyn TranscriptionProvider = ctx.transcriber.as_ref();
        let language = ctx.options.language.as_deref();

        let transcript = with_retry(&ctx.retry, "transcribe", move |_| {
            transcriber.transcribe(media, language)
        })
        .await?;

        tracing::info!(
            source = %self.source.display(),
            provider = transcriber.name(),
            language = %transcript.language,
            segments = transcript.segments.len(),
            "Transcription complete"
        );
        Ok(transcript)
    }

    async fn select(
        &self,
        ctx: &PipelineContext,
        transcript: &Transcript,
    ) -> Result<Vec<HighlightCandidate>, ReelError> {
        let selector: &dyn HighlightSelector = ctx.selector.as_ref();
        let language = ctx
            .options
            .language
            .clone()
            .unwrap_or_else(|| output_language(transcript));
        let constraints = SelectionConstraints::from_config(&ctx.config.highlights, language);
        let constraints = &constraints;
        let desired_count = ctx.options.desired_count;

        let candidates = with_retry(&ctx.retry, "select_highlights", move |_| {
            selector.select(transcript, desired_count, constraints)
        })
        .await?;

        tracing::info!(
            source = %self.source.display(),
            provider = selector.name(),
            candidates = candidates.len(),
            "Highlight selection complete"
        );
        Ok(candidates)
    }

    fn check_shutdown(&self) -> Result<(), ReelError> {
        if self.ctx.is_shutting_down() {
            Err(ReelError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, next: PipelineStage) {
        tracing::info!(
            source = %self.source.display(),
            from = self.stage.as_str(),
            to = next.as_str(),
            "File pipeline transition"
        );
        self.stage = next;
    }
}

/// Language for hooks and summaries when none was requested.
fn output_language(transcript: &Transcript) -> String {
    match transcript.language.trim() {
        "" | "unknown" => "en".to_string(),
        language => language.to_string(),
    }
}

/// Run one render job per highlight with at most `render_workers` in flight.
/// The manifest is ordered by highlight index regardless of finish order.
async fn render_all(
    ctx: &PipelineContext,
    media: Arc<SourceMedia>,
    transcript: Arc<Transcript>,
    highlights: Vec<Highlight>,
    out_dir: &Path,
) -> Manifest {
    let semaphore = Arc::new(Semaphore::new(ctx.options.render_workers.max(1)));
    let mut handles = Vec::with_capacity(highlights.len());

    for highlight in highlights {
        let folder = highlight_output_folder(out_dir, &highlight);
        let job = RenderJob::new(
            highlight.clone(),
            Arc::clone(&media),
            Arc::clone(&transcript),
            folder.clone(),
            Arc::clone(&ctx.render_settings),
            Arc::clone(&ctx.transform),
        )
        .with_shutdown_flag(ctx.shutdown_flag());

        let semaphore = Arc::clone(&semaphore);
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            job.run().await
        });
        handles.push((highlight, folder, handle));
    }

    let mut entries = Vec::with_capacity(handles.len());
    for (highlight, folder, handle) in handles {
        match handle.await {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::error!(index = highlight.index, error = %e, "Render task did not complete");
                let mut entry = RenderManifestEntry::started(highlight, folder);
                entry.mark_failed(RenderStep::ExtractClip, format!("render task aborted: {e}"));
                entries.push(entry);
            }
        }
    }

    Manifest::from_entries(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_output_dir_uses_stem() {
        assert_eq!(
            file_output_dir(Path::new("/out"), Path::new("/in/My Talk.final.mp4")),
            PathBuf::from("/out/My Talk.final")
        );
    }

    #[test]
    fn test_output_language_falls_back_to_english() {
        assert_eq!(output_language(&Transcript::new("unknown", vec![])), "en");
        assert_eq!(output_language(&Transcript::new("fr", vec![])), "fr");
    }
}
