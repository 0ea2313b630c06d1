//! Per-file outcomes and the aggregated run report.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::manifest::{Manifest, ModelError, RenderStatus, RenderStep};

/// Run report file name inside the output root.
pub const RUN_REPORT_FILE_NAME: &str = "run_report.json";

/// States of a file pipeline.
///
/// `Discovered → Transcribing → Selecting → Validating → Rendering →
/// Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Discovered,
    Transcribing,
    Selecting,
    Validating,
    Rendering,
    Completed,
    Failed,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Discovered => "discovered",
            PipelineStage::Transcribing => "transcribing",
            PipelineStage::Selecting => "selecting",
            PipelineStage::Validating => "validating",
            PipelineStage::Rendering => "rendering",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Completed | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate outcome of one file pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOutcome {
    /// Every render job succeeded (including zero highlights).
    Success,
    /// Rendering completed but at least one job failed.
    Partial,
    /// A stage before rendering failed; no manifest.
    Failed,
    /// Not processed because of an input gate.
    Skipped,
}

/// A failed render job, identified for re-runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightFailure {
    pub index: u32,
    pub step: RenderStep,
    pub error: String,
}

/// Outcome of one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub outcome: FileOutcome,

    /// Stage that was running when a `Failed` file stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<PipelineStage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,

    /// Highlights accepted by the validator.
    pub highlights_found: usize,

    /// Highlights whose render job succeeded.
    pub highlights_rendered: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_highlights: Vec<HighlightFailure>,

    pub elapsed_secs: f64,
}

impl FileReport {
    fn empty(source: PathBuf, outcome: FileOutcome) -> Self {
        Self {
            source,
            outcome,
            failed_stage: None,
            error: None,
            skip_reason: None,
            output_dir: None,
            manifest_path: None,
            highlights_found: 0,
            highlights_rendered: 0,
            failed_highlights: vec![],
            elapsed_secs: 0.0,
        }
    }

    /// A file that stopped before rendering finished.
    pub fn failed(source: impl Into<PathBuf>, stage: PipelineStage, error: impl fmt::Display) -> Self {
        let mut report = Self::empty(source.into(), FileOutcome::Failed);
        report.failed_stage = Some(stage);
        report.error = Some(error.to_string());
        report
    }

    pub fn skipped(source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        let mut report = Self::empty(source.into(), FileOutcome::Skipped);
        report.skip_reason = Some(reason.into());
        report
    }

    /// A file whose rendering stage completed; the outcome follows the
    /// manifest: `Success` when every entry succeeded, `Partial` otherwise.
    pub fn completed(
        source: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        manifest: &Manifest,
    ) -> Self {
        let failed_highlights: Vec<HighlightFailure> = manifest
            .failures()
            .map(|entry| match &entry.status {
                RenderStatus::Failed { step, error } => HighlightFailure {
                    index: entry.index(),
                    step: *step,
                    error: error.clone(),
                },
                _ => HighlightFailure {
                    index: entry.index(),
                    step: RenderStep::ExtractClip,
                    error: "render job did not finish".to_string(),
                },
            })
            .collect();

        let outcome = if failed_highlights.is_empty() {
            FileOutcome::Success
        } else {
            FileOutcome::Partial
        };

        let mut report = Self::empty(source.into(), outcome);
        report.output_dir = Some(output_dir.into());
        report.manifest_path = Some(manifest_path.into());
        report.highlights_found = manifest.len();
        report.highlights_rendered = manifest.success_count();
        report.failed_highlights = failed_highlights;
        report
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = elapsed_secs;
        self
    }

    /// One human-readable summary line.
    pub fn summary_line(&self) -> String {
        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string());

        match self.outcome {
            FileOutcome::Success if self.highlights_found == 0 => {
                format!("{name}: no highlights found")
            }
            FileOutcome::Success => format!(
                "{name}: {} highlights -> {}",
                self.highlights_rendered,
                self.output_dir
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            FileOutcome::Partial => {
                let failed = self
                    .failed_highlights
                    .iter()
                    .map(|f| format!("#{} at {}", f.index, f.step))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "{name}: {}/{} highlights rendered, failed: {failed}",
                    self.highlights_rendered, self.highlights_found
                )
            }
            FileOutcome::Failed => format!(
                "{name}: failed while {}: {}",
                self.failed_stage.unwrap_or(PipelineStage::Failed),
                self.error.as_deref().unwrap_or("unknown error")
            ),
            FileOutcome::Skipped => format!(
                "{name}: skipped ({})",
                self.skip_reason.as_deref().unwrap_or("unknown reason")
            ),
        }
    }
}

/// Outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Aggregated outcome of a whole run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// RFC 3339 timestamp of report creation.
    pub generated_at: String,
    pub summary: RunSummary,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn new(files: Vec<FileReport>) -> Self {
        let mut summary = RunSummary {
            total: files.len(),
            ..RunSummary::default()
        };
        for file in &files {
            match file.outcome {
                FileOutcome::Success => summary.success += 1,
                FileOutcome::Partial => summary.partial += 1,
                FileOutcome::Failed => summary.failed += 1,
                FileOutcome::Skipped => summary.skipped += 1,
            }
        }
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary,
            files,
        }
    }

    /// Files that produced output (fully or partially).
    pub fn processed_count(&self) -> usize {
        self.summary.success + self.summary.partial
    }

    /// Process exit code: non-zero when any file failed or nothing was
    /// processable.
    pub fn exit_code(&self) -> i32 {
        if self.summary.failed > 0 || self.processed_count() == 0 {
            1
        } else {
            0
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{Highlight, HighlightCandidate};
    use crate::manifest::RenderManifestEntry;

    fn manifest(statuses: &[bool]) -> Manifest {
        let entries = statuses
            .iter()
            .enumerate()
            .map(|(i, ok)| {
                let index = i as u32 + 1;
                let h = Highlight::from_candidate(index, HighlightCandidate::new(0.0, 10.0, 0.5));
                let mut e = RenderManifestEntry::started(h, "out");
                if *ok {
                    e.mark_success();
                } else {
                    e.mark_failed(RenderStep::BurnSubtitles, "boom");
                }
                e
            })
            .collect();
        Manifest::from_entries(entries)
    }

    #[test]
    fn test_completed_outcome_follows_manifest() {
        let all_ok = FileReport::completed("a.mp4", "out/a", "out/a/highlights.json", &manifest(&[true, true]));
        assert_eq!(all_ok.outcome, FileOutcome::Success);

        let some_failed =
            FileReport::completed("b.mp4", "out/b", "out/b/highlights.json", &manifest(&[true, false]));
        assert_eq!(some_failed.outcome, FileOutcome::Partial);
        assert_eq!(some_failed.failed_highlights.len(), 1);
        assert_eq!(some_failed.failed_highlights[0].index, 2);
        assert_eq!(some_failed.failed_highlights[0].step, RenderStep::BurnSubtitles);
        assert!(some_failed.summary_line().contains("#2 at burn_subtitles"));

        let empty = FileReport::completed("c.mp4", "out/c", "out/c/highlights.json", &Manifest::default());
        assert_eq!(empty.outcome, FileOutcome::Success);
        assert!(empty.summary_line().contains("no highlights found"));
    }

    #[test]
    fn test_exit_code_policy() {
        let ok = FileReport::completed("a.mp4", "o", "o/h.json", &manifest(&[true]));
        let partial = FileReport::completed("b.mp4", "o", "o/h.json", &manifest(&[false]));
        let failed = FileReport::failed("c.mp4", PipelineStage::Transcribing, "no key");
        let skipped = FileReport::skipped("d.mp4", "too short");

        assert_eq!(RunReport::new(vec![ok.clone(), partial.clone()]).exit_code(), 0);
        assert_eq!(RunReport::new(vec![ok.clone(), failed]).exit_code(), 1);
        assert_eq!(RunReport::new(vec![ok, skipped.clone()]).exit_code(), 0);
        assert_eq!(RunReport::new(vec![skipped]).exit_code(), 1);
        assert_eq!(RunReport::new(vec![]).exit_code(), 1);
        assert_eq!(RunReport::new(vec![partial]).summary.partial, 1);
    }

    #[test]
    fn test_failed_summary_names_stage() {
        let report = FileReport::failed("/in/talk.mp4", PipelineStage::Selecting, "bad json");
        assert_eq!(report.summary_line(), "talk.mp4: failed while selecting: bad json");
    }
}
