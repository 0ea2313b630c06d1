use proptest::prelude::*;

use reelforge_media_model::HighlightCandidate;
use reelforge_processing_core::{HighlightValidator, ValidationConstraints};

fn candidate_strategy() -> impl Strategy<Value = HighlightCandidate> {
    (-50.0f64..700.0, -10.0f64..200.0, 0.0f64..=1.0)
        .prop_map(|(start, length, confidence)| HighlightCandidate::new(start, start + length, confidence))
}

fn constraints_strategy() -> impl Strategy<Value = ValidationConstraints> {
    (1.0f64..20.0, 0.0f64..100.0, 0usize..10).prop_map(|(min, extra, count)| ValidationConstraints {
        min_duration_secs: min,
        max_duration_secs: min + extra,
        requested_count: count,
    })
}

proptest! {
    #[test]
    fn highlights_lie_within_source_and_bounds(
        duration in 1.0f64..600.0,
        candidates in prop::collection::vec(candidate_strategy(), 0..30),
        constraints in constraints_strategy(),
    ) {
        let highlights = HighlightValidator::new(constraints.clone()).validate(candidates, duration);

        prop_assert!(highlights.len() <= constraints.requested_count);
        for h in &highlights {
            prop_assert!(0.0 <= h.start_secs);
            prop_assert!(h.start_secs < h.end_secs);
            prop_assert!(h.end_secs <= duration);
            prop_assert!(h.duration_secs() >= constraints.min_duration_secs);
            prop_assert!(h.duration_secs() <= constraints.max_duration_secs);
        }
    }

    #[test]
    fn highlights_are_chronological_and_disjoint(
        duration in 1.0f64..600.0,
        candidates in prop::collection::vec(candidate_strategy(), 0..30),
        constraints in constraints_strategy(),
    ) {
        let highlights = HighlightValidator::new(constraints).validate(candidates, duration);

        for (i, h) in highlights.iter().enumerate() {
            prop_assert_eq!(h.index as usize, i + 1);
        }
        for pair in highlights.windows(2) {
            prop_assert!(pair[0].end_secs <= pair[1].start_secs);
        }
    }

    #[test]
    fn validation_is_deterministic_under_input_order(
        duration in 1.0f64..600.0,
        candidates in prop::collection::vec(candidate_strategy(), 0..30),
        constraints in constraints_strategy(),
    ) {
        let validator = HighlightValidator::new(constraints);
        let forward = validator.validate(candidates.clone(), duration);

        let mut reversed_input = candidates;
        reversed_input.reverse();
        let reversed = validator.validate(reversed_input, duration);

        prop_assert_eq!(forward, reversed);
    }
}

#[test]
fn worked_example_from_two_minute_source() {
    let validator = HighlightValidator::new(ValidationConstraints {
        min_duration_secs: 6.0,
        max_duration_secs: 60.0,
        requested_count: 5,
    });
    let highlights = validator.validate(
        vec![
            HighlightCandidate::new(0.0, 150.0, 0.9),
            HighlightCandidate::new(10.0, 20.0, 0.8),
            HighlightCandidate::new(30.0, 50.0, 0.95),
        ],
        120.0,
    );

    let spans: Vec<_> = highlights.iter().map(|h| (h.index, h.start_secs, h.end_secs)).collect();
    assert_eq!(spans, vec![(1, 10.0, 20.0), (2, 30.0, 50.0)]);
}
