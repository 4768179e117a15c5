//! Output sinks
//!
//! Every stream the checkpoint subsystem writes to is a [`Sink`]: an
//! [`io::Write`] that can also tell how many columns its terminal has. The
//! column count drives the `%*` padding directive and the erase line written
//! at shutdown.

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;

use parking_lot::Mutex;

/// Width used when nothing better is known
pub const DEFAULT_WIDTH: usize = 80;

/// A writable stream that may be attached to a terminal
pub trait Sink: Write {
    /// Column count of the attached terminal, if any
    fn columns(&self) -> Option<usize> {
        None
    }
}

/// Query the window size of a terminal file descriptor
fn fd_columns(fd: RawFd) -> Option<usize> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };
    if result == 0 && ws.ws_col > 0 {
        Some(usize::from(ws.ws_col))
    } else {
        None
    }
}

impl Sink for File {
    fn columns(&self) -> Option<usize> {
        fd_columns(self.as_raw_fd())
    }
}

impl Sink for io::Stdout {
    fn columns(&self) -> Option<usize> {
        fd_columns(self.as_raw_fd())
    }
}

impl Sink for io::Stderr {
    fn columns(&self) -> Option<usize> {
        fd_columns(self.as_raw_fd())
    }
}

impl Sink for Vec<u8> {}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn columns(&self) -> Option<usize> {
        (**self).columns()
    }
}

/// Width of the terminal behind `sink`
///
/// Tries the terminal itself, then a positive integer in `COLUMNS`, then
/// falls back to [`DEFAULT_WIDTH`].
#[must_use]
pub fn terminal_width(sink: &dyn Sink) -> usize {
    if let Some(cols) = sink.columns() {
        return cols;
    }
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&cols| cols > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Shared in-memory sink
///
/// Clones share one buffer, so a caller can hand one clone to a
/// [`Checkpoint`](crate::Checkpoint) and inspect the output through another.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    columns: Option<usize>,
    flushes: Arc<Mutex<usize>>,
}

impl MemorySink {
    /// Create an empty sink with no terminal width
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sink that reports a fixed terminal width
    #[must_use]
    pub fn with_columns(columns: usize) -> Self {
        Self {
            columns: Some(columns),
            ..Self::default()
        }
    }

    /// Everything written so far, lossily decoded
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Take everything written so far, leaving the buffer empty
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.buffer.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Number of times the sink was flushed
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self.flushes.lock()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        *self.flushes.lock() += 1;
        Ok(())
    }
}

impl Sink for MemorySink {
    fn columns(&self) -> Option<usize> {
        self.columns
    }
}
