//! Source media description and supported formats.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Audio container extensions accepted as input (lowercase).
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "flac", "ogg", "wma"];

/// Video container extensions accepted as input (lowercase).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "flv", "webm", "m4v"];

/// Whether the source carries a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Whether a path has a supported media extension.
pub fn is_supported_media(path: &Path) -> bool {
    MediaKind::from_path(path).is_some()
}

/// An input file after probing. Created once per pipeline and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMedia {
    path: PathBuf,
    duration_secs: f64,
    kind: MediaKind,
}

impl SourceMedia {
    pub fn new(path: impl Into<PathBuf>, duration_secs: f64, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            duration_secs,
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_audio(&self) -> bool {
        self.kind == MediaKind::Audio
    }

    /// File name without extension; names the per-source output directory.
    pub fn stem(&self) -> String {
        source_stem(&self.path)
    }
}

/// File stem of a path, falling back to `"source"` for odd names.
pub fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "source".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension_is_case_insensitive() {
        assert_eq!(
            MediaKind::from_path(Path::new("talk.MP4")),
            Some(MediaKind::Video)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("/x/podcast.Flac")),
            Some(MediaKind::Audio)
        );
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn test_source_stem() {
        let media = SourceMedia::new("/in/interview.final.mkv", 90.0, MediaKind::Video);
        assert_eq!(media.stem(), "interview.final");
        assert!(!media.is_audio());
    }
}
