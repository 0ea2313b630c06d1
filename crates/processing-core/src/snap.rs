//! Segment-edge snapping.
//!
//! Models quote timestamps loosely. Before validation, each candidate edge
//! that lands close to a transcript segment edge is moved onto it so clips
//! start and end between sentences rather than inside them.

use reelforge_media_model::{HighlightCandidate, Transcript};

/// Maximum distance an edge is moved, in seconds.
pub const DEFAULT_SNAP_TOLERANCE_SECS: f64 = 1.0;

/// Snap candidate starts to the nearest segment start and ends to the
/// nearest segment end, when that edge is strictly closer than
/// `tolerance_secs`.
///
/// Snapping can lengthen a candidate past the maximum duration or collapse
/// its span; the validator drops those afterwards.
pub fn snap_to_segments(
    candidates: Vec<HighlightCandidate>,
    transcript: &Transcript,
    tolerance_secs: f64,
) -> Vec<HighlightCandidate> {
    if transcript.is_empty() {
        return candidates;
    }

    let starts: Vec<f64> = transcript.segments.iter().map(|s| s.start_secs).collect();
    let ends: Vec<f64> = transcript.segments.iter().map(|s| s.end_secs).collect();

    candidates
        .into_iter()
        .map(|mut candidate| {
            if let Some(start) = nearest(&starts, candidate.start_secs, tolerance_secs) {
                candidate.start_secs = start;
            }
            if let Some(end) = nearest(&ends, candidate.end_secs, tolerance_secs) {
                candidate.end_secs = end;
            }
            candidate
        })
        .collect()
}

fn nearest(edges: &[f64], target: f64, tolerance_secs: f64) -> Option<f64> {
    if !target.is_finite() {
        return None;
    }
    edges
        .iter()
        .copied()
        .filter(|edge| (edge - target).abs() < tolerance_secs)
        .min_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()))
}
