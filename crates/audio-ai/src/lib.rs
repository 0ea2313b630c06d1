//! ReelForge Audio Intelligence
//!
//! Speech-to-text and subtitle output:
//! - **Transcription:** Interchangeable Whisper backends (hosted API or local executable)
//! - **Subtitle Generation:** SRT output, including clip-relative slices of a transcript

pub mod subtitles;
pub mod transcription;

pub use subtitles::*;
pub use transcription::*;
