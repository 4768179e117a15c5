//! Checkpoint context
//!
//! [`Checkpoint`] holds everything the subsystem needs between calls: the
//! compiled action list, the operation counter, the interval, the blocked
//! signal set and the terminal handle. The archive engine owns one and drives
//! it through four calls:
//!
//! 1. [`compile`](Checkpoint::compile) for every action specifier, while
//!    parsing options
//! 2. [`finish_compile`](Checkpoint::finish_compile) once options are done
//! 3. [`note_operation`](Checkpoint::note_operation) on every record read or
//!    written
//! 4. [`flush_and_close`](Checkpoint::flush_and_close) at shutdown
//!
//! # Lifecycle
//!
//! ```text
//!  Uninitialized ──compile──▶ Compiling ──finish_compile──▶ Running
//!        │                                                     ▲
//!        └──finish_compile (interval set, no actions)──────────┘
//!                 (synthesizes a default `echo`)
//! ```
//!
//! A specifier that fails to compile moves the context to [`State::Failed`]
//! and disables it for good.

mod executor;

use std::io;
use std::sync::Arc;

use tracing::{debug, info};

use crate::action::{Action, ActionList};
use crate::compiler::parse_action;
use crate::config::DEFAULT_CHECKPOINT;
use crate::error::CheckpointError;
use crate::exec::{ScriptRunner, ShellRunner};
use crate::signals::BlockedSignals;
use crate::sink::Sink;
use crate::stats::ArchiveContext;
use crate::tty::Terminal;

/// Where the subsystem is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Nothing compiled yet
    Uninitialized,
    /// Specifiers are being compiled
    Compiling,
    /// Actions are frozen and fire on schedule
    Running,
    /// A specifier failed to compile; the actions never run
    Failed,
}

/// Periodic checkpoint actions for one archive run
pub struct Checkpoint {
    state: State,
    actions: ActionList,
    counter: u64,
    interval: u64,
    signals: BlockedSignals,
    tty: Terminal,
    progress: Box<dyn Sink>,
    diagnostics: Box<dyn Sink>,
    archive: Arc<dyn ArchiveContext>,
    runner: Box<dyn ScriptRunner>,
}

impl std::fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoint")
            .field("state", &self.state)
            .field("actions", &self.actions)
            .field("counter", &self.counter)
            .field("interval", &self.interval)
            .field("signals", &self.signals)
            .field("tty", &self.tty)
            .finish_non_exhaustive()
    }
}

impl Checkpoint {
    /// Create a disabled checkpoint context
    ///
    /// Progress dots go to stdout, messages to stderr, `bell`/`ttyout` to the
    /// controlling terminal and `exec` commands through `/bin/sh`.
    #[must_use]
    pub fn new(archive: Arc<dyn ArchiveContext>) -> Self {
        Self {
            state: State::Uninitialized,
            actions: ActionList::new(),
            counter: 0,
            interval: 0,
            signals: BlockedSignals::new(),
            tty: Terminal::controlling(),
            progress: Box::new(io::stdout()),
            diagnostics: Box::new(io::stderr()),
            archive,
            runner: Box::new(ShellRunner),
        }
    }

    /// Set the checkpoint interval; zero disables checkpointing
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Replace the stream that receives progress dots
    #[must_use]
    pub fn with_progress(mut self, sink: impl Sink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    /// Replace the stream that receives messages and totals
    #[must_use]
    pub fn with_diagnostics(mut self, sink: impl Sink + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    /// Replace the terminal used by `bell` and `ttyout`
    #[must_use]
    pub fn with_terminal(mut self, tty: Terminal) -> Self {
        self.tty = tty;
        self
    }

    /// Replace the runner for `exec` actions
    #[must_use]
    pub fn with_script_runner(mut self, runner: impl ScriptRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Set the checkpoint interval; zero disables checkpointing
    ///
    /// Once running, a zero interval is ignored.
    pub fn set_interval(&mut self, interval: u64) {
        if interval == 0 && self.state == State::Running {
            debug!("Ignoring zero checkpoint interval while running");
            return;
        }
        self.interval = interval;
    }

    /// Compile one action specifier and append it to the list
    ///
    /// # Errors
    ///
    /// Any error is fatal: the caller must not go on to process the archive.
    pub fn compile(&mut self, spec: &str) -> Result<(), CheckpointError> {
        match self.state {
            State::Running => return Err(CheckpointError::AlreadyRunning(spec.to_string())),
            State::Failed => return Err(CheckpointError::CompileFailed),
            State::Uninitialized => self.state = State::Compiling,
            State::Compiling => {}
        }

        let action = match parse_action(spec) {
            Ok(action) => action,
            Err(e) => {
                debug!(spec = spec, error = %e, "Checkpoint action rejected");
                self.state = State::Failed;
                self.interval = 0;
                return Err(e);
            }
        };
        if let Action::Wait(signal) = action {
            self.signals.add(signal);
        }
        debug!(spec = spec, action = action.keyword(), "Compiled checkpoint action");
        self.actions.push(action);
        Ok(())
    }

    /// Compile several specifiers in order, stopping at the first failure
    ///
    /// # Errors
    ///
    /// The first compile error.
    pub fn compile_all<I, S>(&mut self, specs: I) -> Result<(), CheckpointError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for spec in specs {
            self.compile(spec.as_ref())?;
        }
        Ok(())
    }

    /// Freeze the action list and start running
    ///
    /// With an interval but no specifiers, a default `echo` action is added.
    /// Once anything was compiled, the `wait` signals are blocked, a zero
    /// interval becomes [`DEFAULT_CHECKPOINT`], and the state turns
    /// [`State::Running`]. Without an interval or specifiers this is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if an earlier specifier failed to compile, or if the signal set
    /// cannot be blocked.
    pub fn finish_compile(&mut self) -> Result<(), CheckpointError> {
        if self.state == State::Failed {
            return Err(CheckpointError::CompileFailed);
        }
        if self.state == State::Uninitialized && self.interval != 0 && self.actions.is_empty() {
            self.compile("echo")?;
        }

        if self.state == State::Compiling {
            self.signals.block()?;
            if self.interval == 0 {
                self.interval = DEFAULT_CHECKPOINT;
            }
            self.state = State::Running;
            info!(
                interval = self.interval,
                actions = self.actions.len(),
                "Checkpoint actions armed"
            );
        }
        Ok(())
    }

    /// Count one archive operation and fire the actions every `interval`
    /// operations
    pub fn note_operation(&mut self, is_write: bool) {
        if self.interval == 0 {
            return;
        }
        self.counter += 1;
        if self.counter % self.interval == 0 {
            self.run_actions(is_write);
        }
    }

    /// Erase a pending status line and close the terminal
    pub fn flush_and_close(&mut self) {
        if self.interval == 0 {
            return;
        }
        if self.actions.has_ttyout() {
            if let Err(e) = self.tty.erase_status_line() {
                debug!(error = %e, "Failed to erase checkpoint status line");
            }
        }
        self.tty.close();
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Compiled actions
    #[must_use]
    pub fn actions(&self) -> &ActionList {
        &self.actions
    }

    /// Operations counted so far
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Checkpoint interval; zero when disabled
    #[must_use]
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Whether checkpoints are counted at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.interval != 0
    }

    /// Signals named by `wait` actions
    #[must_use]
    pub fn blocked_signals(&self) -> &BlockedSignals {
        &self.signals
    }

    /// The terminal resource
    #[must_use]
    pub fn terminal(&self) -> &Terminal {
        &self.tty
    }

    /// The archive collaborator
    #[must_use]
    pub fn archive(&self) -> &Arc<dyn ArchiveContext> {
        &self.archive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::stats::{Subcommand, TransferStats};
    use nix::sys::signal::Signal;
    use pretty_assertions::assert_eq;

    fn checkpoint() -> (Checkpoint, MemorySink) {
        let diag = MemorySink::new();
        let archive = Arc::new(TransferStats::new("ckpt", Subcommand::Create));
        let cp = Checkpoint::new(archive)
            .with_progress(MemorySink::new())
            .with_diagnostics(diag.clone())
            .with_terminal(Terminal::with_opener(Box::new(|| {
                Err::<Box<dyn Sink>, _>(io::Error::new(io::ErrorKind::NotFound, "no tty"))
            })));
        (cp, diag)
    }

    #[test]
    fn test_compile_transitions_to_compiling() {
        let (mut cp, _) = checkpoint();
        assert_eq!(cp.state(), State::Uninitialized);
        cp.compile("dot").unwrap();
        assert_eq!(cp.state(), State::Compiling);
        assert_eq!(cp.actions().len(), 1);
    }

    #[test]
    fn test_failed_compile_appends_nothing() {
        let (mut cp, _) = checkpoint();
        assert!(cp.compile("sleep=abc").is_err());
        assert!(cp.actions().is_empty());
        assert_eq!(cp.state(), State::Failed);
    }

    #[test]
    fn test_failed_compile_never_runs() {
        let (cp, diag) = checkpoint();
        let mut cp = cp.with_interval(1);
        cp.compile("echo=first").unwrap();
        assert!(matches!(
            cp.compile("sleep=-1"),
            Err(CheckpointError::InvalidTimeout(_))
        ));

        assert!(matches!(cp.finish_compile(), Err(CheckpointError::CompileFailed)));
        assert_eq!(cp.state(), State::Failed);
        assert!(!cp.is_enabled());
        assert!(matches!(cp.compile("dot"), Err(CheckpointError::CompileFailed)));
        assert_eq!(cp.actions().len(), 1);

        for _ in 0..5 {
            cp.note_operation(true);
        }
        cp.flush_and_close();
        assert_eq!(cp.counter(), 0);
        assert_eq!(diag.contents(), "");
    }

    #[test]
    fn test_zero_interval_ignored_while_running() {
        let (cp, diag) = checkpoint();
        let mut cp = cp.with_interval(2);
        cp.compile("echo=%u").unwrap();
        cp.finish_compile().unwrap();

        cp.set_interval(0);
        assert_eq!(cp.interval(), 2);
        assert!(cp.is_enabled());

        cp.set_interval(4);
        for _ in 0..4 {
            cp.note_operation(true);
        }
        assert_eq!(diag.contents(), "ckpt: 4\n");
    }

    #[test]
    fn test_zero_interval_accepted_before_running() {
        let (cp, _) = checkpoint();
        let mut cp = cp.with_interval(7);
        cp.set_interval(0);
        assert!(!cp.is_enabled());
    }

    #[test]
    fn test_finish_defaults_interval() {
        let (mut cp, _) = checkpoint();
        cp.compile_all(["dot", "bell"]).unwrap();
        cp.finish_compile().unwrap();

        assert_eq!(cp.state(), State::Running);
        assert_eq!(cp.interval(), DEFAULT_CHECKPOINT);
    }

    #[test]
    fn test_finish_keeps_configured_interval() {
        let (cp, _) = checkpoint();
        let mut cp = cp.with_interval(3);
        cp.compile("dot").unwrap();
        cp.finish_compile().unwrap();
        assert_eq!(cp.interval(), 3);
    }

    #[test]
    fn test_finish_synthesizes_default_echo() {
        let (cp, _) = checkpoint();
        let mut cp = cp.with_interval(5);
        cp.finish_compile().unwrap();

        assert_eq!(cp.state(), State::Running);
        assert_eq!(cp.actions().iter().collect::<Vec<_>>(), vec![&Action::Echo(None)]);
    }

    #[test]
    fn test_finish_without_anything_is_noop() {
        let (mut cp, _) = checkpoint();
        cp.finish_compile().unwrap();
        assert_eq!(cp.state(), State::Uninitialized);
        assert!(cp.actions().is_empty());
        assert!(!cp.is_enabled());
    }

    #[test]
    fn test_compile_after_running_is_rejected() {
        let (mut cp, _) = checkpoint();
        cp.compile("dot").unwrap();
        cp.finish_compile().unwrap();
        assert!(matches!(
            cp.compile("bell"),
            Err(CheckpointError::AlreadyRunning(_))
        ));
        assert_eq!(cp.actions().len(), 1);
    }

    #[test]
    fn test_wait_signals_collected() {
        let (mut cp, _) = checkpoint();
        cp.compile_all(["wait=USR2", "dot", "wait=SIGUSR2"]).unwrap();
        assert_eq!(cp.blocked_signals().signals(), &[Signal::SIGUSR2]);
        assert!(!cp.blocked_signals().is_blocked());
    }

    #[test]
    fn test_disabled_never_counts() {
        let (mut cp, diag) = checkpoint();
        for _ in 0..100 {
            cp.note_operation(true);
        }
        assert_eq!(cp.counter(), 0);
        assert_eq!(diag.contents(), "");
    }

    #[test]
    fn test_fires_every_interval() {
        let (cp, diag) = checkpoint();
        let mut cp = cp.with_interval(3);
        cp.compile("echo=%u").unwrap();
        cp.finish_compile().unwrap();

        for _ in 0..10 {
            cp.note_operation(false);
        }
        assert_eq!(cp.counter(), 10);
        assert_eq!(diag.contents(), "ckpt: 3\nckpt: 6\nckpt: 9\n");
    }

    #[test]
    fn test_flush_disabled_is_noop() {
        let (mut cp, diag) = checkpoint();
        cp.flush_and_close();
        assert_eq!(diag.contents(), "");
    }
}
