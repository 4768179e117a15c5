//! ckpt - Record-copying archiver with checkpoint actions
//!
//! Copies data into or out of an archive one record at a time and runs the
//! configured checkpoint actions every N records.
//!
//! # Usage
//!
//! ```bash
//! # A dot every 10 records
//! ckpt --checkpoint --checkpoint-action=dot create -f out.ar big.iso
//!
//! # Status line on the terminal every 100 records
//! ckpt --checkpoint=100 --checkpoint-action='ttyout=%c' create -f out.ar big.iso
//!
//! # Read it back, printing totals at the end
//! ckpt --checkpoint=50 --totals list -f out.ar
//!
//! # Verbose logging
//! RUST_LOG=debug ckpt --checkpoint create -f out.ar big.iso
//! ```

mod archive;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand as ClapSubcommand};
use tracing::{error, info};

use checkpoint_core::config::{default_config_path, load_config_from_path, ConfigOverrides};
use checkpoint_core::{ArchiveContext, Checkpoint, Subcommand, TransferStats};

/// Name prefixed to checkpoint messages
const PROGRAM_NAME: &str = "ckpt";

/// ckpt - Record-copying archiver with checkpoint actions
#[derive(Parser, Debug)]
#[command(name = "ckpt")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run checkpoint actions every N records (10 when given without a value)
    #[arg(
        long,
        global = true,
        value_name = "N",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "10"
    )]
    checkpoint: Option<u64>,

    /// Action to run at each checkpoint (repeatable, run in order)
    #[arg(long = "checkpoint-action", global = true, value_name = "ACTION")]
    checkpoint_action: Vec<String>,

    /// Blocks of 512 bytes per record
    #[arg(short = 'b', long, global = true, value_name = "BLOCKS")]
    blocking_factor: Option<u64>,

    /// Configuration file path
    #[arg(long, global = true, env = "CKPT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short = 'l',
        long,
        global = true,
        env = "CKPT_LOG_LEVEL",
        default_value = "warn"
    )]
    log_level: String,

    /// Print transfer totals when done
    #[arg(long, global = true)]
    totals: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapSubcommand, Debug)]
enum Command {
    /// Write FILEs into a new archive
    Create {
        /// Archive to create, `-` for stdout
        #[arg(short = 'f', long = "file", value_name = "ARCHIVE")]
        archive: String,

        /// Input files, concatenated in order
        #[arg(required = true, value_name = "FILE")]
        inputs: Vec<PathBuf>,
    },

    /// Read an archive record by record
    List {
        /// Archive to read, `-` for stdin
        #[arg(short = 'f', long = "file", value_name = "ARCHIVE")]
        archive: String,
    },
}

impl Command {
    fn archive(&self) -> &str {
        match self {
            Self::Create { archive, .. } | Self::List { archive } => archive,
        }
    }

    fn subcommand(&self) -> Subcommand {
        match self {
            Self::Create { .. } => Subcommand::Create,
            Self::List { .. } => Subcommand::List,
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "checkpoint_cli={level},checkpoint_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn overrides(args: &Args) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if let Some(interval) = args.checkpoint {
        overrides = overrides.with_interval(interval);
    }
    for action in &args.checkpoint_action {
        overrides = overrides.with_action(action.as_str());
    }
    if let Some(factor) = args.blocking_factor {
        overrides = overrides.with_blocking_factor(factor);
    }
    overrides
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;
    overrides(&args)
        .apply(&mut config)
        .context("Invalid command-line options")?;
    info!(
        source = %config.source(),
        interval = ?config.interval,
        actions = config.actions.len(),
        blocking_factor = config.blocking_factor,
        "Configuration resolved"
    );

    let archive_name = args.command.archive().to_string();
    let stats = Arc::new(
        TransferStats::new(PROGRAM_NAME, args.command.subcommand())
            .with_blocking_factor(config.blocking_factor)
            .with_archive_name(archive_name.as_str()),
    );

    let mut checkpoint =
        Checkpoint::new(stats.clone()).with_interval(config.interval.unwrap_or(0));
    if archive::is_stdio(&archive_name) {
        checkpoint = checkpoint.with_progress(io::stderr());
    }
    checkpoint.compile_all(&config.actions)?;
    checkpoint.finish_compile()?;

    let result = match &args.command {
        Command::Create { archive, inputs } => {
            archive::create(archive, inputs, &stats, &mut checkpoint)
        }
        Command::List { archive } => archive::list(archive, &stats, &mut checkpoint),
    };

    checkpoint.flush_and_close();

    if args.totals {
        let mut stderr = io::stderr().lock();
        stderr
            .write_all(stats.total_stats().as_bytes())
            .context("Failed to print totals")?;
    }

    match result {
        Ok(records) => {
            info!(records = records, "Done");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Archive operation failed");
            Err(e)
        }
    }
}
