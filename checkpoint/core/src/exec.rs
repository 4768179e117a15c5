//! External checkpoint scripts
//!
//! `exec=` actions hand their command line to a [`ScriptRunner`]. The stock
//! [`ShellRunner`] runs it through `/bin/sh -c` and waits for it, exporting the
//! archive name and checkpoint number so the script knows where processing is.

use std::io;
use std::process::{Command, ExitStatus};

/// Shell used to interpret checkpoint commands
pub const SHELL: &str = "/bin/sh";

/// What a checkpoint script is told about the running archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptContext<'a> {
    /// Archive being processed
    pub archive_name: &'a str,
    /// Checkpoint number that fired
    pub checkpoint: u64,
    /// Blocks per record
    pub blocking_factor: u64,
}

impl ScriptContext<'_> {
    /// Environment exported to the child process
    #[must_use]
    pub fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("TAR_VERSION", env!("CARGO_PKG_VERSION").to_string()),
            ("TAR_ARCHIVE", self.archive_name.to_string()),
            ("TAR_CHECKPOINT", self.checkpoint.to_string()),
            ("TAR_BLOCKING_FACTOR", self.blocking_factor.to_string()),
        ]
    }
}

/// Runs `exec=` command lines
pub trait ScriptRunner {
    /// Run `command` to completion
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be started.
    fn run(&mut self, command: &str, context: &ScriptContext<'_>) -> io::Result<ExitStatus>;
}

/// Runs commands with `/bin/sh -c` and waits for them
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellRunner;

impl ScriptRunner for ShellRunner {
    fn run(&mut self, command: &str, context: &ScriptContext<'_>) -> io::Result<ExitStatus> {
        Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .envs(context.env())
            .status()
    }
}
