//! Blocked signal set for `wait=` actions
//!
//! Signals named by `wait=` are collected while compiling, blocked once when
//! the subsystem enters the running state, and then consumed one at a time
//! with a synchronous `sigwait`. Blocked signals queue as pending instead of
//! running their default disposition, so a `wait` never misses one that
//! arrived between checkpoints.

use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow, Signal};
use tracing::debug;

use crate::error::CheckpointError;

const SIGNAL_NAMES: &[(&str, Signal)] = &[
    ("USR1", Signal::SIGUSR1),
    ("USR2", Signal::SIGUSR2),
    ("HUP", Signal::SIGHUP),
    ("INT", Signal::SIGINT),
    ("QUIT", Signal::SIGQUIT),
];

/// Resolve a signal name, with or without the `SIG` prefix
///
/// # Errors
///
/// [`CheckpointError::UnknownSignal`] for names outside the supported set.
pub fn decode_signal(name: &str) -> Result<Signal, CheckpointError> {
    let bare = name.strip_prefix("SIG").unwrap_or(name);
    SIGNAL_NAMES
        .iter()
        .find(|(n, _)| *n == bare)
        .map(|(_, sig)| *sig)
        .ok_or_else(|| CheckpointError::UnknownSignal(name.to_string()))
}

/// Signals that `wait` actions rendezvous on
#[derive(Clone, Debug)]
pub struct BlockedSignals {
    set: SigSet,
    signals: Vec<Signal>,
    blocked: bool,
}

impl Default for BlockedSignals {
    fn default() -> Self {
        Self {
            set: SigSet::empty(),
            signals: Vec::new(),
            blocked: false,
        }
    }
}

impl BlockedSignals {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signal; duplicates are ignored
    pub fn add(&mut self, signal: Signal) {
        if !self.set.contains(signal) {
            self.set.add(signal);
            self.signals.push(signal);
        }
    }

    /// Whether `signal` is in the set
    #[must_use]
    pub fn contains(&self, signal: Signal) -> bool {
        self.set.contains(signal)
    }

    /// Signals in the order they were first named
    #[must_use]
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Whether [`block`](Self::block) has been applied
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Underlying signal set
    #[must_use]
    pub fn as_sigset(&self) -> &SigSet {
        &self.set
    }

    /// Block the whole set for the calling thread (and any thread it spawns
    /// afterwards). Applied at most once.
    ///
    /// # Errors
    ///
    /// Propagates the `sigprocmask` failure.
    pub fn block(&mut self) -> Result<(), CheckpointError> {
        if self.blocked {
            return Ok(());
        }
        if !self.signals.is_empty() {
            sigprocmask(SigmaskHow::SIG_BLOCK, Some(&self.set), None)?;
            debug!(signals = ?self.signals, "Blocked checkpoint wait signals");
        }
        self.blocked = true;
        Ok(())
    }

    /// Wait for one pending signal from the set and consume it
    ///
    /// # Errors
    ///
    /// Propagates the `sigwait` failure.
    pub fn wait(&self) -> nix::Result<Signal> {
        self.set.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_signal_names() {
        assert_eq!(decode_signal("USR1").unwrap(), Signal::SIGUSR1);
        assert_eq!(decode_signal("SIGUSR2").unwrap(), Signal::SIGUSR2);
        assert_eq!(decode_signal("HUP").unwrap(), Signal::SIGHUP);
        assert_eq!(decode_signal("SIGINT").unwrap(), Signal::SIGINT);
        assert_eq!(decode_signal("QUIT").unwrap(), Signal::SIGQUIT);
    }

    #[test]
    fn test_decode_signal_rejects_unknown() {
        assert!(matches!(
            decode_signal("TERM"),
            Err(CheckpointError::UnknownSignal(name)) if name == "TERM"
        ));
        assert!(decode_signal("usr1").is_err());
        assert!(decode_signal("").is_err());
    }

    #[test]
    fn test_set_ignores_duplicates() {
        let mut set = BlockedSignals::new();
        assert!(set.is_empty());
        set.add(Signal::SIGUSR1);
        set.add(Signal::SIGHUP);
        set.add(Signal::SIGUSR1);

        assert_eq!(set.signals(), &[Signal::SIGUSR1, Signal::SIGHUP]);
        assert!(set.contains(Signal::SIGHUP));
        assert!(!set.contains(Signal::SIGUSR2));
        assert!(!set.is_blocked());
    }

    #[test]
    fn test_block_empty_set_is_noop() {
        let mut set = BlockedSignals::new();
        set.block().unwrap();
        assert!(set.is_blocked());
    }
}
