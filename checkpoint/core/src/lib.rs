//! Checkpoint Core - Periodic progress actions for archive processing
//!
//! An archive engine counts every record it reads or writes. Every N records a
//! *checkpoint* fires and runs a user-configured list of actions: print a dot,
//! ring the terminal bell, echo a formatted message, redraw a status line on
//! the terminal, sleep, run a shell command, print running totals, or block
//! until a signal arrives.
//!
//! # Architecture
//!
//! ```text
//!   --checkpoint-action=ARG  ──▶ compiler ──▶ ActionList
//!                                                │
//!   record read/written ──▶ Checkpoint::note_operation
//!                                                │ every N
//!                                                ▼
//!                                           executor ──▶ Formatter ──▶ Sink / Terminal
//!                                                │
//!                                                ├──▶ ScriptRunner (exec=)
//!                                                └──▶ BlockedSignals (wait=)
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use checkpoint_core::{Checkpoint, Subcommand, TransferStats};
//!
//! let stats = Arc::new(TransferStats::new("ckpt", Subcommand::Create));
//! let mut checkpoint = Checkpoint::new(stats.clone()).with_interval(10);
//! checkpoint.compile("dot")?;
//! checkpoint.finish_compile()?;
//!
//! for record in records {
//!     stats.add_bytes_written(record.len() as u64);
//!     checkpoint.note_operation(true);
//! }
//! checkpoint.flush_and_close();
//! ```
//!
//! # Module Overview
//!
//! - [`action`]: Compiled action variants and the ordered list
//! - [`checkpoint`]: The [`Checkpoint`] context, scheduler and executor
//! - [`compiler`]: Specifier parsing
//! - [`config`]: TOML/environment configuration
//! - [`error`]: Error types
//! - [`exec`]: External command runner for `exec=`
//! - [`format`]: Template interpreter for `echo` and `ttyout`
//! - [`signals`]: Signal names and the `wait=` signal set
//! - [`sink`]: Output streams and terminal width
//! - [`stats`]: Archive context and transfer totals
//! - [`text`]: Quoting and word splitting helpers
//! - [`tty`]: The controlling terminal

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod checkpoint;
pub mod compiler;
pub mod config;
pub mod error;
pub mod exec;
pub mod format;
pub mod signals;
pub mod sink;
pub mod stats;
pub mod text;
pub mod tty;

pub use action::{Action, ActionList};
pub use checkpoint::{Checkpoint, State};
pub use compiler::parse_action;
pub use error::{CheckpointError, FormatError};
pub use exec::{ScriptContext, ScriptRunner, ShellRunner};
pub use format::{Formatter, DEFAULT_FORMAT};
pub use signals::{decode_signal, BlockedSignals};
pub use sink::{terminal_width, MemorySink, Sink};
pub use stats::{ArchiveContext, Subcommand, TransferStats};
pub use tty::Terminal;

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, CheckpointConfig, ConfigError,
    ConfigOverrides, ConfigSource, DEFAULT_CHECKPOINT,
};
