//! Error Types
//!
//! Two families of errors come out of the checkpoint subsystem:
//!
//! - [`CheckpointError`]: fatal configuration errors raised while compiling
//!   action specifiers or entering the running state. The caller must not start
//!   archive processing after one of these.
//! - [`FormatError`]: recoverable problems found while expanding a display
//!   template. They are reported on the diagnostic stream and rendering goes on.

use thiserror::Error;

/// Fatal errors raised while setting up checkpoint actions
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The specifier matches none of the known action forms
    #[error("{0}: unknown checkpoint action")]
    UnknownAction(String),

    /// `sleep=` argument is not a full non-negative integer in range
    #[error("{0}: not a valid timeout")]
    InvalidTimeout(String),

    /// `wait=` names a signal outside the supported set
    #[error("Unknown signal name: {0}")]
    UnknownSignal(String),

    /// A specifier arrived after the action list was frozen
    #[error("{0}: checkpoint actions are already running")]
    AlreadyRunning(String),

    /// An earlier specifier failed to compile
    #[error("checkpoint actions failed to compile")]
    CompileFailed,

    /// Blocking the wait signals failed
    #[error("cannot block checkpoint signals: {0}")]
    SignalMask(#[from] nix::Error),
}

impl CheckpointError {
    /// Short stable label for logs
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::UnknownAction(_) => "unknown_action",
            Self::InvalidTimeout(_) => "invalid_timeout",
            Self::UnknownSignal(_) => "unknown_signal",
            Self::AlreadyRunning(_) => "already_running",
            Self::CompileFailed => "compile_failed",
            Self::SignalMask(_) => "signal_mask",
        }
    }
}

/// Recoverable errors found while rendering a template
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The `%T` argument could not be split into words
    #[error("cannot split string '{arg}': {reason}")]
    Split {
        /// Raw brace argument
        arg: String,
        /// Why the splitter gave up
        reason: String,
    },

    /// The `%T` argument names more than three fields
    #[error("too many words in '{0}'")]
    TooManyWords(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_messages() {
        assert_eq!(
            CheckpointError::UnknownAction("beep".into()).to_string(),
            "beep: unknown checkpoint action"
        );
        assert_eq!(
            CheckpointError::InvalidTimeout("sleep=x".into()).to_string(),
            "sleep=x: not a valid timeout"
        );
        assert_eq!(
            CheckpointError::UnknownSignal("TERM".into()).as_label(),
            "unknown_signal"
        );
    }

    #[test]
    fn test_format_messages() {
        let err = FormatError::Split {
            arg: "a,\"b".into(),
            reason: "missing closing quote".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot split string 'a,\"b': missing closing quote"
        );
        assert_eq!(
            FormatError::TooManyWords("a,b,c,d".into()).to_string(),
            "too many words in 'a,b,c,d'"
        );
    }
}
