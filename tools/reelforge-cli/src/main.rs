//! ReelForge CLI: turn long recordings into short captioned reels.
//!
//! Usage:
//!   reelforge run --input <PATH>   Transcribe, pick highlights, and render reels
//!   reelforge check                Check external tools and API keys
//!   reelforge config               Print the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reelforge_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelforge",
    about = "Find the best moments in long audio and video and render them as reels",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/reelforge/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a media file or every media file in a directory
    Run {
        /// Input file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output root (one folder per source file)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Number of highlights to request per file
        #[arg(short = 'n', long = "count")]
        count: Option<usize>,

        /// Spoken language hint; also the language of hooks and summaries
        #[arg(short, long)]
        lang: Option<String>,

        /// Confirm you hold the rights to process the inputs
        #[arg(long)]
        confirm_copyright: bool,

        /// Process files concurrently
        #[arg(long, conflicts_with = "sequential")]
        parallel: bool,

        /// Process files one at a time
        #[arg(long)]
        sequential: bool,

        /// Maximum files processed concurrently in parallel mode
        #[arg(short, long)]
        workers: Option<usize>,

        /// Maximum render jobs in flight per file
        #[arg(long)]
        render_workers: Option<usize>,
    },

    /// Check external tools and API keys
    Check,

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    reelforge_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Run {
            input,
            out,
            count,
            lang,
            confirm_copyright,
            parallel,
            sequential,
            workers,
            render_workers,
        } => {
            let args = commands::run::RunArgs {
                input,
                out,
                count,
                lang,
                confirm_copyright,
                parallel: if parallel {
                    Some(true)
                } else if sequential {
                    Some(false)
                } else {
                    None
                },
                workers,
                render_workers,
            };
            let exit_code = commands::run::run(config, args).await?;
            std::process::exit(exit_code);
        }
        Commands::Check => commands::check::run(&config),
        Commands::Config => commands::config::run(&config),
    }
}
