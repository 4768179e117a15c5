//! Controlling terminal resource
//!
//! `bell` and `ttyout` write to the controlling terminal rather than to the
//! (possibly redirected) standard streams. The handle is opened on first use,
//! shared by every action, and closed once at shutdown.

use std::fs::OpenOptions;
use std::io::{self, Write};

use tracing::debug;

use crate::sink::{terminal_width, Sink};

/// Path of the controlling terminal
pub const TTY_PATH: &str = "/dev/tty";

/// Opens the terminal handle on demand
pub type TtyOpener = Box<dyn FnMut() -> io::Result<Box<dyn Sink>>>;

fn open_controlling_tty() -> io::Result<Box<dyn Sink>> {
    let file = OpenOptions::new().write(true).open(TTY_PATH)?;
    Ok(Box::new(file))
}

/// Lazily opened, process-lifetime terminal handle
pub struct Terminal {
    handle: Option<Box<dyn Sink>>,
    opener: TtyOpener,
    cleanup_owed: bool,
    closed: bool,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::controlling()
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("open", &self.handle.is_some())
            .field("cleanup_owed", &self.cleanup_owed)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Terminal {
    /// Terminal backed by [`TTY_PATH`]
    #[must_use]
    pub fn controlling() -> Self {
        Self::with_opener(Box::new(open_controlling_tty))
    }

    /// Terminal backed by a custom opener
    #[must_use]
    pub fn with_opener(opener: TtyOpener) -> Self {
        Self {
            handle: None,
            opener,
            cleanup_owed: false,
            closed: false,
        }
    }

    /// The shared handle, opening it on first use
    ///
    /// An open failure is silent and retried on the next call. Returns `None`
    /// once the terminal was closed.
    pub fn get(&mut self) -> Option<&mut dyn Sink> {
        if self.closed {
            return None;
        }
        if self.handle.is_none() {
            match (self.opener)() {
                Ok(handle) => {
                    debug!(path = TTY_PATH, "Opened terminal for checkpoint output");
                    self.handle = Some(handle);
                }
                Err(e) => {
                    debug!(error = %e, "Terminal unavailable, skipping action");
                    return None;
                }
            }
        }
        self.handle.as_deref_mut().map(|h| h as &mut dyn Sink)
    }

    /// Whether the handle is currently open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether a partial status line still needs erasing
    #[must_use]
    pub fn cleanup_owed(&self) -> bool {
        self.cleanup_owed
    }

    /// Record that a carriage return left a partial line on the terminal
    pub fn mark_cleanup(&mut self) {
        self.cleanup_owed = true;
    }

    /// Blank out the current status line with a full-width run of spaces
    /// followed by a carriage return. Does nothing unless cleanup is owed and
    /// the handle is open.
    ///
    /// # Errors
    ///
    /// Propagates write failures on the terminal.
    pub fn erase_status_line(&mut self) -> io::Result<bool> {
        if !self.cleanup_owed {
            return Ok(false);
        }
        let Some(handle) = self.handle.as_deref_mut() else {
            return Ok(false);
        };
        let width = terminal_width(handle);
        let mut line = " ".repeat(width);
        line.push('\r');
        handle.write_all(line.as_bytes())?;
        handle.flush()?;
        self.cleanup_owed = false;
        Ok(true)
    }

    /// Close the handle; later [`get`](Self::get) calls return `None`
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let _ = handle.flush();
            debug!("Closed checkpoint terminal");
        }
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn memory_terminal(sink: &MemorySink) -> Terminal {
        let sink = sink.clone();
        Terminal::with_opener(Box::new(move || Ok(Box::new(sink.clone()) as Box<dyn Sink>)))
    }

    #[test]
    fn test_opens_lazily() {
        let sink = MemorySink::new();
        let mut tty = memory_terminal(&sink);
        assert!(!tty.is_open());

        tty.get().unwrap().write_all(b"\x07").unwrap();
        assert!(tty.is_open());
        assert_eq!(sink.contents(), "\x07");
    }

    #[test]
    fn test_open_failure_is_silent_and_retried() {
        let mut attempts = 0;
        let mut tty = Terminal::with_opener(Box::new(move || {
            attempts += 1;
            if attempts == 1 {
                Err(io::Error::new(io::ErrorKind::NotFound, "no tty"))
            } else {
                Ok(Box::new(Vec::<u8>::new()) as Box<dyn Sink>)
            }
        }));

        assert!(tty.get().is_none());
        assert!(tty.get().is_some());
    }

    #[test]
    fn test_erase_only_when_owed() {
        let sink = MemorySink::with_columns(5);
        let mut tty = memory_terminal(&sink);
        tty.get();

        assert!(!tty.erase_status_line().unwrap());
        tty.mark_cleanup();
        assert!(tty.erase_status_line().unwrap());
        assert!(!tty.erase_status_line().unwrap());
        assert_eq!(sink.contents(), "     \r");
    }

    #[test]
    fn test_closed_terminal_stays_closed() {
        let sink = MemorySink::new();
        let mut tty = memory_terminal(&sink);
        tty.get();
        tty.close();
        assert!(!tty.is_open());
        assert!(tty.get().is_none());
    }
}
