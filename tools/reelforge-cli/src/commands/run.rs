//! Run the reel pipeline over a file or directory.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use reelforge_common::config::AppConfig;
use reelforge_media_model::RunReport;
use reelforge_pipeline::{PipelineContext, RunCoordinator, RunOptions};

/// Command-line overrides of the configured run options.
pub struct RunArgs {
    pub input: PathBuf,
    pub out: Option<PathBuf>,
    pub count: Option<usize>,
    pub lang: Option<String>,
    pub confirm_copyright: bool,
    pub parallel: Option<bool>,
    pub workers: Option<usize>,
    pub render_workers: Option<usize>,
}

impl RunArgs {
    fn apply(self, options: &mut RunOptions) -> PathBuf {
        if let Some(out) = self.out {
            options.out_root = out;
        }
        if let Some(count) = self.count {
            options.desired_count = count;
        }
        if self.lang.is_some() {
            options.language = self.lang;
        }
        options.confirm_copyright = self.confirm_copyright;
        if let Some(parallel) = self.parallel {
            options.parallel_files = parallel;
        }
        if let Some(workers) = self.workers {
            options.file_workers = workers.max(1);
        }
        if let Some(workers) = self.render_workers {
            options.render_workers = workers.max(1);
        }
        self.input
    }
}

/// Returns the process exit code.
pub async fn run(config: AppConfig, args: RunArgs) -> anyhow::Result<i32> {
    let mut options = RunOptions::from_config(&config);
    let input = args.apply(&mut options);

    if options.desired_count == 0 {
        anyhow::bail!("highlight count must be at least 1");
    }

    println!("Processing: {}", input.display());
    println!("  Output: {}", options.out_root.display());
    println!("  Highlights per file: {}", options.desired_count);
    println!(
        "  Mode: {}",
        if options.parallel_files {
            format!("parallel ({} workers)", options.file_workers)
        } else {
            "sequential".to_string()
        }
    );

    let ctx = PipelineContext::from_config(Arc::new(config), options)
        .map_err(|e| anyhow::anyhow!("Cannot start pipeline: {e}"))?;
    let coordinator = RunCoordinator::new(ctx);

    let shutdown = coordinator.shutdown_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight steps");
            eprintln!("\nInterrupted: no new files or render steps will start");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let report = coordinator
        .run(&input)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    print_summary(&report);
    Ok(report.exit_code())
}

fn print_summary(report: &RunReport) {
    let s = &report.summary;
    println!();
    println!("Run Summary");
    println!("{}", "=".repeat(50));
    println!(
        "  {} files: {} success, {} partial, {} failed, {} skipped",
        s.total, s.success, s.partial, s.failed, s.skipped
    );
    for file in &report.files {
        println!("  {}", file.summary_line());
    }
    if s.total == 0 {
        println!("  No supported media files were found.");
    }
}
