//! Render manifest (`highlights.json`).
//!
//! One entry per validated highlight, written in highlight index order
//! regardless of the order in which render jobs finished.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::highlight::Highlight;

/// Manifest file name inside `{out_root}/{source_stem}/`.
pub const MANIFEST_FILE_NAME: &str = "highlights.json";

/// Steps of a render job, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStep {
    ExtractClip,
    AspectVariant,
    Subtitles,
    BurnSubtitles,
    Caption,
}

impl RenderStep {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderStep::ExtractClip => "extract_clip",
            RenderStep::AspectVariant => "aspect_variant",
            RenderStep::Subtitles => "subtitles",
            RenderStep::BurnSubtitles => "burn_subtitles",
            RenderStep::Caption => "caption",
        }
    }
}

impl fmt::Display for RenderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one render job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenderStatus {
    /// Job started but not finalized.
    Pending,
    Success,
    Failed { step: RenderStep, error: String },
}

/// Artifacts produced by a render job. Only completed artifacts are listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedFiles {
    pub base_clip: Option<PathBuf>,

    /// Aspect-ratio variants keyed by format name (`"9:16"`).
    #[serde(default)]
    pub variants: BTreeMap<String, PathBuf>,

    /// Variants with burned-in subtitles, keyed by format name.
    #[serde(default)]
    pub burned: BTreeMap<String, PathBuf>,

    pub subtitles: Option<PathBuf>,
    pub caption: Option<PathBuf>,
}

/// The record of one render job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderManifestEntry {
    pub highlight: Highlight,
    pub output_folder: PathBuf,
    pub files: RenderedFiles,
    pub status: RenderStatus,
}

impl RenderManifestEntry {
    /// Entry for a job that is about to start.
    pub fn started(highlight: Highlight, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            highlight,
            output_folder: output_folder.into(),
            files: RenderedFiles::default(),
            status: RenderStatus::Pending,
        }
    }

    pub fn index(&self) -> u32 {
        self.highlight.index
    }

    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Success
    }

    pub fn mark_success(&mut self) {
        self.status = RenderStatus::Success;
    }

    pub fn mark_failed(&mut self, step: RenderStep, error: impl fmt::Display) {
        self.status = RenderStatus::Failed {
            step,
            error: error.to_string(),
        };
    }
}

/// Ordered list of render outcomes for one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<RenderManifestEntry>,
}

impl Manifest {
    /// Build a manifest, ordering entries by highlight index.
    pub fn from_entries(mut entries: Vec<RenderManifestEntry>) -> Self {
        entries.sort_by_key(|e| e.index());
        Self { entries }
    }

    pub fn entries(&self) -> &[RenderManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_success()).count()
    }

    /// Entries that did not finish successfully.
    pub fn failures(&self) -> impl Iterator<Item = &RenderManifestEntry> {
        self.entries.iter().filter(|e| !e.is_success())
    }

    /// Write pretty JSON to `path`, replacing any previous manifest.
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

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Errors from persisting model artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::HighlightCandidate;

    fn entry(index: u32, ok: bool) -> RenderManifestEntry {
        let highlight = Highlight::from_candidate(
            index,
            HighlightCandidate::new(index as f64 * 10.0, index as f64 * 10.0 + 8.0, 0.9),
        );
        let mut entry = RenderManifestEntry::started(highlight, format!("out/highlight_{index:02}"));
        if ok {
            entry.mark_success();
        } else {
            entry.mark_failed(RenderStep::AspectVariant, "ffmpeg exited with 1");
        }
        entry
    }

    #[test]
    fn test_entries_sorted_by_index() {
        let manifest = Manifest::from_entries(vec![entry(3, true), entry(1, false), entry(2, true)]);
        let order: Vec<_> = manifest.entries().iter().map(|e| e.index()).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(manifest.success_count(), 2);
        assert_eq!(manifest.failures().count(), 1);
    }

    #[test]
    fn test_status_serialization_shape() {
        let failed = serde_json::to_value(entry(1, false).status).unwrap();
        assert_eq!(failed["state"], "failed");
        assert_eq!(failed["step"], "aspect_variant");

        let ok = serde_json::to_value(RenderStatus::Success).unwrap();
        assert_eq!(ok["state"], "success");
    }

    #[test]
    fn test_manifest_is_a_json_array_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);

        let manifest = Manifest::from_entries(vec![entry(1, true)]);
        manifest.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.is_array());
        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_empty_manifest_saves_as_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        Manifest::default().save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }
}
