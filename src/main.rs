//! # drive-extract CLI
//!
//! ## Usage
//!
//! ```bash
//! drive-extract --config ./config/drive-extract.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `drive-extract run` | List Drive files and extract every supported one |
//! | `drive-extract file <id>...` | Extract specific files by id |
//! | `drive-extract formats` | Show supported content types and output directories |
//!
//! Logging is controlled with `RUST_LOG` (default `info`) and goes to
//! stderr together with progress, so stdout only carries the summary.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drive_extract::config::{self, Config};
use drive_extract::progress::ProgressMode;
use drive_extract::run;
use drive_extract::traits::ExtractorRegistry;

const DEFAULT_CONFIG: &str = "./config/drive-extract.toml";

/// Extract plain text from Google Drive files.
#[derive(Parser)]
#[command(name = "drive-extract", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the default path does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Progress on stderr: off, human, or json. Default: human when stderr
    /// is a TTY, otherwise off.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List Drive files and extract every supported one.
    Run {
        /// Maximum number of files to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Only list and classify files; nothing is downloaded or written.
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract specific files by id.
    File {
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show supported content types.
    Formats,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(path: &Path) -> Result<Config> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        let cfg = Config::default();
        config::validate(&cfg)?;
        return Ok(cfg);
    }
    config::load_config(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that don't require config
    if let Commands::Formats = cli.command {
        run::list_formats(&ExtractorRegistry::with_builtins());
        return Ok(());
    }

    let cfg = resolve_config(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Run {
            limit,
            dry_run,
            json,
        } => {
            run::run_extract(&cfg, limit, dry_run, json, progress).await?;
        }
        Commands::File { ids, json } => {
            run::run_files(&cfg, &ids, json).await?;
        }
        Commands::Formats => {}
    }

    Ok(())
}
