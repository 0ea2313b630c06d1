//! The run coordinator: discovery, bounded cross-file concurrency, and
//! aggregation into the run report.
//!
//! Every file pipeline runs in its own task and writes only beneath its own
//! `{out_root}/{source_stem}` directory, so one file's failure cannot touch
//! another's output. The run as a whole only stops early on a shutdown
//! signal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::Semaphore;

use reelforge_common::error::{ReelError, ReelResult};
use reelforge_media_model::{FileReport, PipelineStage, RunReport, RUN_REPORT_FILE_NAME};

use crate::context::PipelineContext;
use crate::discovery::{discover_inputs, stem_collisions};
use crate::file_pipeline::FilePipeline;

pub struct RunCoordinator {
    ctx: Arc<PipelineContext>,
}

impl RunCoordinator {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Flag that, once set, stops new files and render steps from starting.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.ctx.shutdown_flag()
    }

    /// Discover inputs under `input`, process them, and persist the report.
    ///
    /// Only discovery errors (missing path, unsupported single file) are
    /// returned as `Err`; per-file failures are part of the report.
    pub async fn run(&self, input: &Path) -> ReelResult<RunReport> {
        let files = discover_inputs(input)?;
        if files.is_empty() {
            tracing::warn!(input = %input.display(), "No supported media files found");
        }
        let report = self.run_files(files).await;
        self.save_report(&report);
        Ok(report)
    }

    /// Process an explicit list of files.
    pub async fn run_files(&self, files: Vec<PathBuf>) -> RunReport {
        let workers = self.ctx.options.effective_file_workers();
        tracing::info!(
            files = files.len(),
            workers,
            parallel = self.ctx.options.parallel_files,
            out_root = %self.ctx.options.out_root.display(),
            "Starting run"
        );

        let collisions: HashMap<PathBuf, PathBuf> = stem_collisions(&files).into_iter().collect();

        let reports = if workers > 1 {
            self.run_parallel(files, &collisions, workers).await
        } else {
            self.run_sequential(files, &collisions).await
        };

        let report = RunReport::new(reports);
        tracing::info!(
            success = report.summary.success,
            partial = report.summary.partial,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            "Run finished"
        );
        report
    }

    async fn run_sequential(
        &self,
        files: Vec<PathBuf>,
        collisions: &HashMap<PathBuf, PathBuf>,
    ) -> Vec<FileReport> {
        let mut reports = Vec::with_capacity(files.len());
        for file in files {
            let report = match self.precheck(&file, collisions) {
                Some(report) => report,
                None => FilePipeline::new(file, Arc::clone(&self.ctx)).run().await,
            };
            reports.push(report);
        }
        reports
    }

    async fn run_parallel(
        &self,
        files: Vec<PathBuf>,
        collisions: &HashMap<PathBuf, PathBuf>,
        workers: usize,
    ) -> Vec<FileReport> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut slots = Vec::with_capacity(files.len());

        for file in files {
            if let Some(report) = self.precheck(&file, collisions) {
                slots.push(Slot::Done(report));
                continue;
            }

            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&semaphore);
            let path = file.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                if ctx.is_shutting_down() {
                    return interrupted(&path);
                }
                FilePipeline::new(path, ctx).run().await
            });
            slots.push(Slot::Running(file, handle));
        }

        let mut reports = Vec::with_capacity(slots.len());
        for slot in slots {
            let report = match slot {
                Slot::Done(report) => report,
                Slot::Running(file, handle) => match handle.await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(source = %file.display(), error = %e, "File task did not complete");
                        FileReport::failed(file, PipelineStage::Discovered, format!("pipeline task aborted: {e}"))
                    }
                },
            };
            reports.push(report);
        }
        reports
    }

    /// Reports for files that must not start.
    fn precheck(&self, file: &Path, collisions: &HashMap<PathBuf, PathBuf>) -> Option<FileReport> {
        if let Some(owner) = collisions.get(file) {
            let err = ReelError::unsupported(format!(
                "output folder collides with {}",
                owner.display()
            ));
            tracing::warn!(source = %file.display(), error = %err, "Not processing file");
            return Some(FileReport::failed(file, PipelineStage::Discovered, err));
        }
        if self.ctx.is_shutting_down() {
            return Some(interrupted(file));
        }
        None
    }

    fn save_report(&self, report: &RunReport) {
        let out_root = &self.ctx.options.out_root;
        let path = out_root.join(RUN_REPORT_FILE_NAME);
        let result = std::fs::create_dir_all(out_root)
            .map_err(ReelError::from)
            .and_then(|()| report.save(&path).map_err(|e| ReelError::Other(e.into())));
        match result {
            Ok(()) => tracing::info!(path = %path.display(), "Run report written"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to write run report"),
        }
    }
}

enum Slot {
    Done(FileReport),
    Running(PathBuf, tokio::task::JoinHandle<FileReport>),
}

fn interrupted(file: &Path) -> FileReport {
    FileReport::failed(file, PipelineStage::Discovered, ReelError::Interrupted)
}
