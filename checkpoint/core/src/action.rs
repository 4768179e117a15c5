//! Action Model
//!
//! A compiled checkpoint directive and the ordered list that holds them.
//! Actions run in the order they were given on the command line.

use std::time::Duration;

use nix::sys::signal::Signal;

/// One compiled checkpoint action
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Print a `.` on the progress stream
    Dot,
    /// Ring the terminal bell
    Bell,
    /// Print a message on the diagnostic stream; `None` uses the default template
    Echo(Option<String>),
    /// Render a template straight to the controlling terminal
    Ttyout(String),
    /// Pause processing
    Sleep(Duration),
    /// Run an external command line
    Exec(String),
    /// Print running byte totals
    Totals,
    /// Block until the given signal is delivered
    Wait(Signal),
}

impl Action {
    /// Specifier keyword for this action
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Bell => "bell",
            Self::Echo(_) => "echo",
            Self::Ttyout(_) => "ttyout",
            Self::Sleep(_) => "sleep",
            Self::Exec(_) => "exec",
            Self::Totals => "totals",
            Self::Wait(_) => "wait",
        }
    }
}

/// Append-only, ordered list of actions
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action at the tail
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Actions in execution order
    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Number of actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no action was compiled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether any action writes a status line to the terminal
    #[must_use]
    pub fn has_ttyout(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, Action::Ttyout(_)))
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
