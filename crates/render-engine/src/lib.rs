//! ReelForge Render Engine
//!
//! Turns validated highlights into reel artifacts by driving an external
//! media-transform tool (ffmpeg) one explicit step at a time.
//!
//! # Render Job
//!
//! ```text
//! source.mp4 ──► clip.mp4 ──┬──► clip_1x1.mp4  ──┐
//!  (window)                 └──► clip_9x16.mp4 ──┤
//! transcript ──► clip.srt ───────────────────────┴──► clip_*_subs.mp4 (optional)
//! hook/summary ──► caption.txt
//! ```

pub mod ffmpeg;
pub mod job;
pub mod transform;

pub use ffmpeg::FfmpegBackend;
pub use job::*;
pub use transform::*;
