//! Render jobs: one per validated highlight.
//!
//! A job owns its output folder exclusively and reads only finalized,
//! shared inputs (source media, transcript, settings). Every step is a
//! self-contained call into the media-transform collaborator, so re-running a
//! job overwrites its previous artifacts with the same paths.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reelforge_audio_ai::subtitles::{clip_segments, save_subtitles};
use reelforge_common::config::{AspectFormat, RenderConfig};
use reelforge_common::error::{ReelError, ReelResult};
use reelforge_media_model::{Highlight, RenderManifestEntry, RenderStep, SourceMedia, Transcript};

use crate::transform::{EncodeSettings, MediaTransform, SubtitleStyle, TargetSize, TransformRequest};

pub const BASE_CLIP_FILE_NAME: &str = "clip.mp4";
pub const SUBTITLE_FILE_NAME: &str = "clip.srt";
pub const CAPTION_FILE_NAME: &str = "caption.txt";

/// Rendering parameters shared by every job of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub formats: Vec<AspectFormat>,
    pub burn_subtitles: bool,
    pub encode: EncodeSettings,
    pub subtitle_style: SubtitleStyle,
}

impl RenderSettings {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            formats: config.formats.clone(),
            burn_subtitles: config.burn_subtitles,
            encode: EncodeSettings::from_config(config),
            subtitle_style: SubtitleStyle::from_config(config),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

/// Output folder of one highlight: `{out_root}/{source_stem}/highlight_{NN}`.
pub fn highlight_output_folder(file_output_dir: &Path, highlight: &Highlight) -> PathBuf {
    file_output_dir.join(highlight.folder_name())
}

/// File name of an aspect-ratio variant, e.g. `clip_9x16.mp4`.
pub fn variant_file_name(format: &AspectFormat) -> String {
    format!("clip_{}.mp4", format.file_label())
}

/// File name of a variant with burned-in subtitles, e.g. `clip_9x16_subs.mp4`.
pub fn burned_file_name(format: &AspectFormat) -> String {
    format!("clip_{}_subs.mp4", format.file_label())
}

/// Caption artifact text.
pub fn caption_text(highlight: &Highlight) -> String {
    format!(
        "Caption (Hook):\n{}\n\nSummary:\n{}\n",
        highlight.hook.trim(),
        highlight.summary.trim()
    )
}

/// The unit of rendering work for one highlight.
pub struct RenderJob {
    highlight: Highlight,
    media: Arc<SourceMedia>,
    transcript: Arc<Transcript>,
    output_folder: PathBuf,
    settings: Arc<RenderSettings>,
    transform: Arc<dyn MediaTransform>,
    shutdown: Arc<AtomicBool>,
}

impl RenderJob {
    pub fn new(
        highlight: Highlight,
        media: Arc<SourceMedia>,
        transcript: Arc<Transcript>,
        output_folder: impl Into<PathBuf>,
        settings: Arc<RenderSettings>,
        transform: Arc<dyn MediaTransform>,
    ) -> Self {
        Self {
            highlight,
            media,
            transcript,
            output_folder: output_folder.into(),
            settings,
            transform,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop before the next step once `flag` is set.
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn highlight(&self) -> &Highlight {
        &self.highlight
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Run every step. Never fails: the outcome is recorded in the entry.
    pub async fn run(self) -> RenderManifestEntry {
        let started = std::time::Instant::now();
        let mut entry = RenderManifestEntry::started(self.highlight.clone(), &self.output_folder);

        tracing::info!(
            index = self.highlight.index,
            start_secs = self.highlight.start_secs,
            end_secs = self.highlight.end_secs,
            folder = %self.output_folder.display(),
            "Render job started"
        );

        match self.run_steps(&mut entry).await {
            Ok(()) => {
                entry.mark_success();
                tracing::info!(
                    index = self.highlight.index,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Render job finished"
                );
            }
            Err((step, err)) => {
                tracing::warn!(
                    index = self.highlight.index,
                    step = step.as_str(),
                    error = %err,
                    "Render job failed"
                );
                entry.mark_failed(step, err);
            }
        }
        entry
    }

    async fn run_steps(&self, entry: &mut RenderManifestEntry) -> Result<(), (RenderStep, ReelError)> {
        let h = &self.highlight;
        let settings = &self.settings;

        // 1. Base clip at source resolution (waveform canvas for audio).
        self.check_shutdown(RenderStep::ExtractClip)?;
        std::fs::create_dir_all(&self.output_folder)
            .map_err(|e| (RenderStep::ExtractClip, ReelError::from(e)))?;
        let base_clip = self.output_folder.join(BASE_CLIP_FILE_NAME);
        let extract = TransformRequest::new(self.media.path(), &base_clip, settings.encode.clone())
            .with_window(h.start_secs, h.end_secs)
            .with_waveform(self.media.is_audio());
        self.transform_step(RenderStep::ExtractClip, &extract).await?;
        entry.files.base_clip = Some(base_clip.clone());

        // 2. Aspect-ratio variants from the base clip.
        for format in &settings.formats {
            self.check_shutdown(RenderStep::AspectVariant)?;
            let output = self.output_folder.join(variant_file_name(format));
            let request = TransformRequest::new(&base_clip, &output, settings.encode.clone()).with_target(
                TargetSize::Fit {
                    width: format.width,
                    height: format.height,
                },
            );
            self.transform_step(RenderStep::AspectVariant, &request).await?;
            entry.files.variants.insert(format.name.clone(), output);
        }

        // 3. Clip-relative subtitles; written even when there is no speech.
        self.check_shutdown(RenderStep::Subtitles)?;
        let cues = clip_segments(&self.transcript, h.start_secs, h.end_secs);
        let srt = self.output_folder.join(SUBTITLE_FILE_NAME);
        save_subtitles(&cues, &srt).map_err(|e| (RenderStep::Subtitles, e))?;
        entry.files.subtitles = Some(srt.clone());

        // 4. Burned variants.
        if settings.burn_subtitles && !cues.is_empty() {
            for format in &settings.formats {
                self.check_shutdown(RenderStep::BurnSubtitles)?;
                let Some(variant) = entry.files.variants.get(&format.name).cloned() else {
                    continue;
                };
                let output = self.output_folder.join(burned_file_name(format));
                let request = TransformRequest::new(&variant, &output, settings.encode.clone())
                    .with_burned_subtitles(&srt, settings.subtitle_style.clone());
                self.transform_step(RenderStep::BurnSubtitles, &request).await?;
                entry.files.burned.insert(format.name.clone(), output);
            }
        } else if settings.burn_subtitles {
            tracing::debug!(index = h.index, "No speech in clip, skipping subtitle burn-in");
        }

        // 5. Caption.
        self.check_shutdown(RenderStep::Caption)?;
        let caption = self.output_folder.join(CAPTION_FILE_NAME);
        std::fs::write(&caption, caption_text(h))
            .map_err(|e| (RenderStep::Caption, ReelError::from(e)))?;
        entry.files.caption = Some(caption);

        Ok(())
    }

    fn check_shutdown(&self, step: RenderStep) -> Result<(), (RenderStep, ReelError)> {
        if self.shutdown.load(Ordering::SeqCst) {
            Err((step, ReelError::Interrupted))
        } else {
            Ok(())
        }
    }

    async fn transform_step(
        &self,
        step: RenderStep,
        request: &TransformRequest,
    ) -> Result<(), (RenderStep, ReelError)> {
        tracing::debug!(
            index = self.highlight.index,
            step = step.as_str(),
            output = %request.output.display(),
            "Running render step"
        );
        remove_stale_output(&request.output).map_err(|e| (step, e))?;
        self.transform
            .run(request)
            .await
            .and_then(|()| ensure_output(&request.output))
            .map_err(|e| (step, e))
    }
}

/// Delete a previous run's artifact so that verification only sees output
/// written by this step.
fn remove_stale_output(path: &Path) -> ReelResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ReelError::render_step(
            "remove_stale_output",
            format!("cannot replace {}: {e}", path.display()),
        )),
    }
}

fn ensure_output(path: &Path) -> ReelResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ReelError::render_step(
            "verify_output",
            format!("expected output {} was not produced", path.display()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reelforge_media_model::{HighlightCandidate, MediaKind, RenderStatus, TranscriptSegment};
    use std::sync::Mutex;

    /// Writes a placeholder for every output and records requests.
    #[derive(Default)]
    struct RecordingTransform {
        requests: Mutex<Vec<TransformRequest>>,
        fail_on_output_containing: Option<&'static str>,
        skip_writing: bool,
    }

    #[async_trait]
    impl MediaTransform for RecordingTransform {
        fn name(&self) -> &str {
            "recording"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn probe(&self, path: &Path) -> ReelResult<SourceMedia> {
            Ok(SourceMedia::new(path, 120.0, MediaKind::Video))
        }

        async fn run(&self, request: &TransformRequest) -> ReelResult<()> {
            self.requests.lock().unwrap().push(request.clone());
            let name = request.output.display().to_string();
            if let Some(marker) = self.fail_on_output_containing {
                if name.contains(marker) {
                    return Err(ReelError::render_step("ffmpeg", "exit status 1"));
                }
            }
            if !self.skip_writing {
                std::fs::write(&request.output, name)?;
            }
            Ok(())
        }
    }

    fn highlight() -> Highlight {
        Highlight::from_candidate(
            2,
            HighlightCandidate::new(10.0, 20.0, 0.9).with_text("Big hook", "Line one.\nLine two."),
        )
    }

    fn transcript() -> Arc<Transcript> {
        Arc::new(Transcript::new(
            "en",
            vec![
                TranscriptSegment::new(8.0, 12.0, "first words"),
                TranscriptSegment::new(12.0, 18.0, "more words"),
            ],
        ))
    }

    fn job(dir: &Path, transform: Arc<RecordingTransform>, settings: RenderSettings, kind: MediaKind) -> RenderJob {
        job_with_transcript(dir, transform, settings, kind, transcript())
    }

    fn job_with_transcript(
        dir: &Path,
        transform: Arc<RecordingTransform>,
        settings: RenderSettings,
        kind: MediaKind,
        transcript: Arc<Transcript>,
    ) -> RenderJob {
        let h = highlight();
        let folder = highlight_output_folder(&dir.join("talk"), &h);
        RenderJob::new(
            h,
            Arc::new(SourceMedia::new("/in/talk.mp4", 120.0, kind)),
            transcript,
            folder,
            Arc::new(settings),
            transform,
        )
    }

    #[tokio::test]
    async fn test_successful_job_lists_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let transform = Arc::new(RecordingTransform::default());
        let entry = job(dir.path(), transform.clone(), RenderSettings::default(), MediaKind::Video)
            .run()
            .await;

        assert_eq!(entry.status, RenderStatus::Success);
        assert_eq!(entry.output_folder, dir.path().join("talk").join("highlight_02"));
        assert!(entry.files.variants["1:1"].ends_with("clip_1x1.mp4"));
        assert!(entry.files.variants["9:16"].ends_with("clip_9x16.mp4"));
        assert!(entry.files.burned.is_empty());

        let srt = std::fs::read_to_string(entry.files.subtitles.as_ref().unwrap()).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\nfirst words"));

        let caption = std::fs::read_to_string(entry.files.caption.as_ref().unwrap()).unwrap();
        assert_eq!(caption, "Caption (Hook):\nBig hook\n\nSummary:\nLine one.\nLine two.\n");

        let requests = transform.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].start_secs, Some(10.0));
        assert_eq!(requests[0].end_secs, Some(20.0));
        assert!(!requests[0].waveform);
        assert_eq!(requests[1].input, entry.files.base_clip.clone().unwrap());
    }

    #[tokio::test]
    async fn test_burn_in_produces_variant_per_format() {
        let dir = tempfile::tempdir().unwrap();
        let transform = Arc::new(RecordingTransform::default());
        let settings = RenderSettings {
            burn_subtitles: true,
            ..RenderSettings::default()
        };
        let entry = job(dir.path(), transform.clone(), settings, MediaKind::Audio).run().await;

        assert!(entry.is_success());
        assert_eq!(entry.files.burned.len(), 2);
        assert!(entry.files.burned["9:16"].ends_with("clip_9x16_subs.mp4"));

        let requests = transform.requests.lock().unwrap();
        assert!(requests[0].waveform);
        assert!(requests[3].burn_subtitles.is_some());
    }

    #[tokio::test]
    async fn test_step_failure_is_recorded_with_step() {
        let dir = tempfile::tempdir().unwrap();
        let transform = Arc::new(RecordingTransform {
            fail_on_output_containing: Some("9x16"),
            ..RecordingTransform::default()
        });
        let entry = job(dir.path(), transform, RenderSettings::default(), MediaKind::Video)
            .run()
            .await;

        match &entry.status {
            RenderStatus::Failed { step, .. } => assert_eq!(*step, RenderStep::AspectVariant),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(entry.files.variants.contains_key("1:1"));
        assert!(!entry.files.variants.contains_key("9:16"));
        assert!(entry.files.caption.is_none());
    }

    #[tokio::test]
    async fn test_missing_output_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transform = Arc::new(RecordingTransform {
            skip_writing: true,
            ..RecordingTransform::default()
        });
        let entry = job(dir.path(), transform, RenderSettings::default(), MediaKind::Video)
            .run()
            .await;

        assert!(matches!(
            entry.status,
            RenderStatus::Failed {
                step: RenderStep::ExtractClip,
                ..
            }
        ));
        assert!(entry.files.base_clip.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_marks_job_failed() {
        let dir = tempfile::tempdir().unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let entry = job(
            dir.path(),
            Arc::new(RecordingTransform::default()),
            RenderSettings::default(),
            MediaKind::Video,
        )
        .with_shutdown_flag(flag)
        .run()
        .await;

        assert!(!entry.is_success());
        assert!(entry.files.base_clip.is_none());
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let transform = Arc::new(RecordingTransform::default());
        let first = job(dir.path(), transform.clone(), RenderSettings::default(), MediaKind::Video)
            .run()
            .await;
        let second = job(dir.path(), transform, RenderSettings::default(), MediaKind::Video)
            .run()
            .await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rerun_does_not_accept_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let first = job(
            dir.path(),
            Arc::new(RecordingTransform::default()),
            RenderSettings::default(),
            MediaKind::Video,
        )
        .run()
        .await;
        assert!(first.is_success());
        assert!(first.files.base_clip.as_ref().unwrap().is_file());

        let silent = Arc::new(RecordingTransform {
            skip_writing: true,
            ..RecordingTransform::default()
        });
        let second = job(dir.path(), silent, RenderSettings::default(), MediaKind::Video)
            .run()
            .await;

        assert!(matches!(
            second.status,
            RenderStatus::Failed {
                step: RenderStep::ExtractClip,
                ..
            }
        ));
        assert!(second.files.base_clip.is_none());
        assert!(!first.files.base_clip.unwrap().exists());
    }

    #[tokio::test]
    async fn test_burn_in_skipped_when_clip_has_no_speech() {
        let dir = tempfile::tempdir().unwrap();
        let transform = Arc::new(RecordingTransform::default());
        let settings = RenderSettings {
            burn_subtitles: true,
            ..RenderSettings::default()
        };
        let quiet = Arc::new(Transcript::new(
            "en",
            vec![
                TranscriptSegment::new(0.0, 5.0, "before the clip"),
                TranscriptSegment::new(40.0, 45.0, "after the clip"),
            ],
        ));
        let entry = job_with_transcript(dir.path(), transform.clone(), settings, MediaKind::Video, quiet)
            .run()
            .await;

        assert!(entry.is_success());
        assert!(entry.files.burned.is_empty());
        let srt = entry.files.subtitles.as_ref().unwrap();
        assert_eq!(std::fs::read_to_string(srt).unwrap(), "");
        assert!(entry.files.caption.is_some());

        let requests = transform.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.burn_subtitles.is_none()));
        assert!(!entry.output_folder.join("clip_9x16_subs.mp4").exists());
    }
}
