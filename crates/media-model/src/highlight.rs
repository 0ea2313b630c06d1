//! Highlight candidates and validated highlights.

use serde::{Deserialize, Serialize};

/// A time range proposed by a highlight selector. Untrusted: it may exceed the
/// source, violate duration bounds, or overlap its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightCandidate {
    pub start_secs: f64,
    pub end_secs: f64,
    /// One-sentence hook for the caption.
    pub hook: String,
    /// Short summary of the key point.
    pub summary: String,
    /// Selector confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

impl HighlightCandidate {
    pub fn new(start_secs: f64, end_secs: f64, confidence: f64) -> Self {
        Self {
            start_secs,
            end_secs,
            hook: String::new(),
            summary: String::new(),
            confidence,
        }
    }

    pub fn with_text(mut self, hook: impl Into<String>, summary: impl Into<String>) -> Self {
        self.hook = hook.into();
        self.summary = summary.into();
        self
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Half-open overlap test; touching ranges do not overlap.
    pub fn overlaps(&self, other: &HighlightCandidate) -> bool {
        self.start_secs < other.end_secs && other.start_secs < self.end_secs
    }
}

/// A validated highlight.
///
/// Within one source: `0 <= start < end <= duration`, the length lies within
/// the configured bounds, and no two highlights overlap. `index` is 1-based
/// in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub index: u32,
    pub start_secs: f64,
    pub end_secs: f64,
    pub hook: String,
    pub summary: String,
    pub confidence: f64,
}

impl Highlight {
    pub fn from_candidate(index: u32, candidate: HighlightCandidate) -> Self {
        Self {
            index,
            start_secs: candidate.start_secs,
            end_secs: candidate.end_secs,
            hook: candidate.hook,
            summary: candidate.summary,
            confidence: candidate.confidence,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Directory name for this highlight's artifacts, e.g. `highlight_03`.
    pub fn folder_name(&self) -> String {
        format!("highlight_{:02}", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let a = HighlightCandidate::new(0.0, 10.0, 0.5);
        let b = HighlightCandidate::new(10.0, 20.0, 0.5);
        let c = HighlightCandidate::new(9.5, 12.0, 0.5);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_folder_name_is_zero_padded() {
        let h = Highlight::from_candidate(3, HighlightCandidate::new(1.0, 9.0, 0.9));
        assert_eq!(h.folder_name(), "highlight_03");
        assert!((h.duration_secs() - 8.0).abs() < 1e-9);
    }
}
