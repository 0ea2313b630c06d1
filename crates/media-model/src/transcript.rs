//! Transcripts and timed segments.

use serde::{Deserialize, Serialize};

/// A single transcribed segment with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_secs: f64,
    /// End time in seconds.
    pub end_secs: f64,
    /// Transcribed text.
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self {
            start_secs,
            end_secs,
            text: text.into(),
        }
    }

    /// Whether the segment shares any time with `[start, end)`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start_secs < end && self.end_secs > start
    }
}

/// Full transcription of one source, segments ordered by start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Detected or hinted language code; `"unknown"` when neither is known.
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Build a transcript, ordering segments by start time and dropping
    /// blank or zero-length ones.
    pub fn new(language: impl Into<String>, mut segments: Vec<TranscriptSegment>) -> Self {
        segments.retain(|s| !s.text.trim().is_empty() && s.end_secs > s.start_secs);
        segments.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));
        Self {
            language: language.into(),
            segments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segment text joined with single spaces.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Segments overlapping `[start, end)`, in order.
    pub fn segments_between(&self, start: f64, end: f64) -> impl Iterator<Item = &TranscriptSegment> {
        self.segments.iter().filter(move |s| s.overlaps(start, end))
    }
}
