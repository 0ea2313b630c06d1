//! ReelForge Processing Core: the Highlight Validator
//!
//! Reconciles model-proposed time ranges with the source they refer to:
//! - **Snapping:** Edges close to a transcript segment edge move onto it
//! - **Clamping:** Ranges are pulled inside the source duration
//! - **Duration bounds:** Ranges outside the configured min/max are dropped
//! - **Overlap reconciliation:** Higher-confidence ranges win contested time
//!
//! This crate is pure computation with no I/O and no provider calls.

pub mod snap;
pub mod validator;

pub use snap::{snap_to_segments, DEFAULT_SNAP_TOLERANCE_SECS};
pub use validator::{
    validate_candidates, HighlightValidator, Rejection, ValidationConstraints, ValidationStats,
};
