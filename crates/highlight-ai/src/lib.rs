//! ReelForge Highlight AI
//!
//! Asks a language model which parts of a transcript make good reels:
//! - **Prompt:** Timestamped transcript rendering and the response contract
//! - **Parse:** Tolerant, per-entry validated parsing of model output
//! - **Selector:** Hosted OpenAI and Anthropic backends behind one trait
//!
//! Candidates returned here are untrusted; the validator in
//! `reelforge-processing-core` decides what is rendered.

pub mod parse;
pub mod prompt;
pub mod selector;

pub use parse::parse_candidates;
pub use prompt::build_prompt;
pub use selector::*;
