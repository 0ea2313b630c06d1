//! Highlight validation: turning untrusted candidates into renderable
//! highlights.
//!
//! # Algorithm
//!
//! 1. **Clamp** each candidate into `[0, duration]`; drop it if the clamped
//!    span is empty.
//! 2. **Duration filter**: drop candidates whose length falls outside
//!    `[min_duration, max_duration]`. Candidates are never truncated, since
//!    the hook and summary describe the whole range.
//! 3. **Reconcile overlaps**: order by confidence descending, then start
//!    ascending, then end ascending, and greedily accept every candidate that
//!    does not overlap an accepted one.
//! 4. **Order and truncate**: sort accepted candidates by start and keep at
//!    most `requested_count`.
//! 5. **Index** the result from 1.
//!
//! The output is a deterministic function of the input: the ordering in step
//! 3 is total, so equal-confidence conflicts resolve to the earliest start.

use std::cmp::Ordering;

use reelforge_common::config::HighlightConfig;
use reelforge_media_model::{Highlight, HighlightCandidate};

/// Bounds applied by the validator.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConstraints {
    /// Shortest accepted highlight (seconds).
    pub min_duration_secs: f64,

    /// Longest accepted highlight (seconds).
    pub max_duration_secs: f64,

    /// Maximum number of highlights returned.
    pub requested_count: usize,
}

impl Default for ValidationConstraints {
    fn default() -> Self {
        Self {
            min_duration_secs: 6.0,
            max_duration_secs: 60.0,
            requested_count: 5,
        }
    }
}

impl ValidationConstraints {
    pub fn from_config(config: &HighlightConfig, requested_count: usize) -> Self {
        Self {
            min_duration_secs: config.min_duration,
            max_duration_secs: config.max_duration,
            requested_count,
        }
    }
}

/// Why a candidate was rejected. Used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Non-finite times, or an empty span after clamping.
    InvalidSpan,
    TooShort,
    TooLong,
    /// Overlaps a candidate that ranked higher.
    Overlap,
    /// Accepted but beyond the requested count.
    OverCount,
}

/// Counts of dropped candidates, per reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub received: usize,
    pub invalid_span: usize,
    pub too_short: usize,
    pub too_long: usize,
    pub overlap: usize,
    pub over_count: usize,
    pub accepted: usize,
}

impl ValidationStats {
    fn reject(&mut self, reason: Rejection) {
        match reason {
            Rejection::InvalidSpan => self.invalid_span += 1,
            Rejection::TooShort => self.too_short += 1,
            Rejection::TooLong => self.too_long += 1,
            Rejection::Overlap => self.overlap += 1,
            Rejection::OverCount => self.over_count += 1,
        }
    }
}

/// The highlight validator.
pub struct HighlightValidator {
    constraints: ValidationConstraints,
}

impl HighlightValidator {
    pub fn new(constraints: ValidationConstraints) -> Self {
        Self { constraints }
    }

    pub fn with_defaults() -> Self {
        Self::new(ValidationConstraints::default())
    }

    pub fn constraints(&self) -> &ValidationConstraints {
        &self.constraints
    }

    /// Validate candidates against a source of `duration_secs`.
    ///
    /// An empty result is a legitimate outcome.
    pub fn validate(&self, candidates: Vec<HighlightCandidate>, duration_secs: f64) -> Vec<Highlight> {
        self.validate_with_stats(candidates, duration_secs).0
    }

    /// Like [`validate`](Self::validate), also returning rejection counts.
    pub fn validate_with_stats(
        &self,
        candidates: Vec<HighlightCandidate>,
        duration_secs: f64,
    ) -> (Vec<Highlight>, ValidationStats) {
        let c = &self.constraints;
        let mut stats = ValidationStats {
            received: candidates.len(),
            ..ValidationStats::default()
        };

        let mut eligible = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match clamp_and_filter(candidate, duration_secs, c) {
                Ok(candidate) => eligible.push(candidate),
                Err(reason) => stats.reject(reason),
            }
        }

        eligible.sort_by(rank);

        let mut accepted: Vec<HighlightCandidate> = Vec::with_capacity(eligible.len());
        for candidate in eligible {
            if accepted.iter().any(|a| a.overlaps(&candidate)) {
                stats.reject(Rejection::Overlap);
            } else {
                accepted.push(candidate);
            }
        }

        accepted.sort_by(|a, b| {
            a.start_secs
                .total_cmp(&b.start_secs)
                .then_with(|| a.end_secs.total_cmp(&b.end_secs))
        });
        if accepted.len() > c.requested_count {
            for _ in accepted.drain(c.requested_count..) {
                stats.reject(Rejection::OverCount);
            }
        }

        let highlights: Vec<Highlight> = accepted
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| Highlight::from_candidate(i as u32 + 1, candidate))
            .collect();
        stats.accepted = highlights.len();

        tracing::debug!(?stats, duration_secs, "Validated highlight candidates");
        (highlights, stats)
    }
}

/// Validate with explicit constraints.
pub fn validate_candidates(
    candidates: Vec<HighlightCandidate>,
    duration_secs: f64,
    constraints: &ValidationConstraints,
) -> Vec<Highlight> {
    HighlightValidator::new(constraints.clone()).validate(candidates, duration_secs)
}

fn clamp_and_filter(
    mut candidate: HighlightCandidate,
    duration_secs: f64,
    constraints: &ValidationConstraints,
) -> Result<HighlightCandidate, Rejection> {
    if !candidate.start_secs.is_finite() || !candidate.end_secs.is_finite() {
        return Err(Rejection::InvalidSpan);
    }

    candidate.start_secs = candidate.start_secs.max(0.0);
    candidate.end_secs = candidate.end_secs.min(duration_secs);
    if candidate.start_secs >= candidate.end_secs {
        return Err(Rejection::InvalidSpan);
    }

    let length = candidate.duration_secs();
    if length < constraints.min_duration_secs {
        return Err(Rejection::TooShort);
    }
    if length > constraints.max_duration_secs {
        return Err(Rejection::TooLong);
    }

    candidate.confidence = if candidate.confidence.is_finite() {
        candidate.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Ok(candidate)
}

/// Confidence descending, then start ascending, then end ascending.
fn rank(a: &HighlightCandidate, b: &HighlightCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.start_secs.total_cmp(&b.start_secs))
        .then_with(|| a.end_secs.total_cmp(&b.end_secs))
}
