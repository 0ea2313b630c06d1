//! ReelForge Pipeline
//!
//! Orchestration of a whole run:
//! - **Discovery:** Resolve an input path to supported media files
//! - **File Pipeline:** Transcribe → select → validate → render for one file
//! - **Run Coordinator:** Bounded cross-file concurrency and the run report
//!
//! Data flows strictly downward: the coordinator owns pipelines, pipelines
//! own render jobs, and nothing holds a reference back to its caller.

pub mod context;
pub mod coordinator;
pub mod discovery;
pub mod file_pipeline;

pub use context::{PipelineContext, RunOptions};
pub use coordinator::RunCoordinator;
pub use discovery::discover_inputs;
pub use file_pipeline::{file_output_dir, FilePipeline, COPYRIGHT_SKIP_REASON};
