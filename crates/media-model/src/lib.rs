//! ReelForge Media Model
//!
//! Defines the data contracts shared by every stage of the reel pipeline:
//! - **Media:** The probed, immutable description of one input file
//! - **Transcript:** Timed speech segments produced by a transcription provider
//! - **Highlight:** Untrusted candidates from a selector and validated highlights
//! - **Manifest:** The persisted per-file list of render outcomes
//! - **Report:** Per-file outcomes aggregated over a whole run
//!
//! All times are seconds from the start of the source media.

pub mod highlight;
pub mod manifest;
pub mod media;
pub mod report;
pub mod transcript;

pub use highlight::*;
pub use manifest::*;
pub use media::*;
pub use report::*;
pub use transcript::*;
