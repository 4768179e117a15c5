//! Archive statistics collaborator
//!
//! The checkpoint subsystem never counts bytes itself. It asks an
//! [`ArchiveContext`] for elapsed time, formatted totals, the archive name and
//! a few other facts about the running archive operation. [`TransferStats`] is
//! the stock implementation: atomic counters that the archive engine bumps as
//! it moves records.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Size of one tape block in bytes
pub const BLOCK_SIZE: u64 = 512;

/// Default number of blocks per record
pub const DEFAULT_BLOCKING_FACTOR: u64 = 20;

/// Labels used by `%T` when no argument is given
pub const CHECKPOINT_TOTAL_LABELS: [&str; 3] = ["R", "W", "D"];

/// Labels used by the `totals` action
pub const TOTAL_LABELS: [&str; 3] = [
    "Total bytes read",
    "Total bytes written",
    "Total bytes deleted",
];

/// Facts about the running archive operation
pub trait ArchiveContext: Send + Sync {
    /// Name prefixed to diagnostic messages
    fn program_name(&self) -> &str;

    /// Name of the archive currently being processed
    fn archive_name(&self) -> Option<String>;

    /// Time since processing began
    fn elapsed(&self) -> Duration;

    /// Number of blocks per record
    fn blocking_factor(&self) -> u64 {
        DEFAULT_BLOCKING_FACTOR
    }

    /// Render the running totals
    ///
    /// `labels` selects the read, written and deleted fields in that order;
    /// fields are joined with `separator`.
    fn format_totals(&self, labels: [Option<&str>; 3], separator: char) -> String;

    /// Render the end-of-run totals line, newline included
    fn total_stats(&self) -> String {
        let mut out = self.format_totals(TOTAL_LABELS.map(Some), '\n');
        out.push('\n');
        out
    }

    /// Look up the localized form of a message
    fn translate<'a>(&self, msgid: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(msgid)
    }
}

/// What the archive engine is doing, which decides the totals that apply
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Subcommand {
    /// Writing a new archive
    #[default]
    Create,
    /// Appending members
    Append,
    /// Updating members
    Update,
    /// Concatenating archives
    Concatenate,
    /// Extracting members
    Extract,
    /// Listing members
    List,
    /// Comparing members against the file system
    Diff,
    /// Deleting members in place
    Delete,
}

impl Subcommand {
    fn kind(self) -> TotalsKind {
        match self {
            Self::Create | Self::Append | Self::Update | Self::Concatenate => TotalsKind::Write,
            Self::Extract | Self::List | Self::Diff => TotalsKind::Read,
            Self::Delete => TotalsKind::Delete,
        }
    }
}

enum TotalsKind {
    Read,
    Write,
    Delete,
}

/// Atomic transfer counters for one archive run
#[derive(Debug)]
pub struct TransferStats {
    program_name: String,
    archive_name: RwLock<Option<String>>,
    subcommand: Subcommand,
    blocking_factor: u64,
    started: Instant,
    records_read: AtomicU64,
    records_skipped: AtomicU64,
    bytes_written: AtomicU64,
    prev_written: AtomicU64,
    frozen_elapsed: RwLock<Option<Duration>>,
}

impl TransferStats {
    /// Start counting now
    pub fn new(program_name: impl Into<String>, subcommand: Subcommand) -> Self {
        Self {
            program_name: program_name.into(),
            archive_name: RwLock::new(None),
            subcommand,
            blocking_factor: DEFAULT_BLOCKING_FACTOR,
            started: Instant::now(),
            records_read: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            prev_written: AtomicU64::new(0),
            frozen_elapsed: RwLock::new(None),
        }
    }

    /// Set the blocking factor
    #[must_use]
    pub fn with_blocking_factor(mut self, blocking_factor: u64) -> Self {
        self.blocking_factor = blocking_factor.max(1);
        self
    }

    /// Set the archive name
    #[must_use]
    pub fn with_archive_name(self, name: impl Into<String>) -> Self {
        *self.archive_name.write() = Some(name.into());
        self
    }

    /// Change the archive name (e.g. on a volume switch)
    pub fn set_archive_name(&self, name: impl Into<String>) {
        *self.archive_name.write() = Some(name.into());
    }

    /// Pin the reported elapsed time, for reproducible output
    pub fn freeze_elapsed(&self, elapsed: Duration) {
        *self.frozen_elapsed.write() = Some(elapsed);
    }

    /// Bytes in one record
    #[must_use]
    pub fn record_size(&self) -> u64 {
        self.blocking_factor * BLOCK_SIZE
    }

    /// The subcommand being counted
    #[must_use]
    pub fn subcommand(&self) -> Subcommand {
        self.subcommand
    }

    /// Count one record read
    pub fn add_record_read(&self) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one record skipped over without being read
    pub fn add_record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count bytes written to the current volume
    pub fn add_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Close the current volume, carrying its written bytes forward
    pub fn next_volume(&self) {
        let current = self.bytes_written.swap(0, Ordering::Relaxed);
        self.prev_written.fetch_add(current, Ordering::Relaxed);
    }

    /// Bytes read so far
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.records_read.load(Ordering::Relaxed) * self.record_size()
    }

    /// Bytes written so far, over all volumes
    #[must_use]
    pub fn total_written(&self) -> u64 {
        self.prev_written.load(Ordering::Relaxed) + self.bytes_written.load(Ordering::Relaxed)
    }

    fn bytes_deleted(&self) -> i128 {
        let read = i128::from(self.records_read.load(Ordering::Relaxed));
        let skipped = i128::from(self.records_skipped.load(Ordering::Relaxed));
        (read - skipped) * i128::from(self.record_size()) - i128::from(self.total_written())
    }

    fn stat_field(&self, label: Option<&str>, bytes: u64) -> String {
        let mut out = String::new();
        if let Some(label) = label.filter(|l| !l.is_empty()) {
            out.push_str(&self.translate(label));
            out.push_str(": ");
        }
        let secs = self.elapsed().as_secs_f64();
        let rate = if secs > 0.0 {
            human_readable((bytes as f64 / secs) as u64)
        } else {
            "?".to_string()
        };
        out.push_str(&format!("{bytes} ({}, {rate}/s)", human_readable(bytes)));
        out
    }
}

impl ArchiveContext for TransferStats {
    fn program_name(&self) -> &str {
        &self.program_name
    }

    fn archive_name(&self) -> Option<String> {
        self.archive_name.read().clone()
    }

    fn elapsed(&self) -> Duration {
        self.frozen_elapsed
            .read()
            .unwrap_or_else(|| self.started.elapsed())
    }

    fn blocking_factor(&self) -> u64 {
        self.blocking_factor
    }

    fn format_totals(&self, labels: [Option<&str>; 3], separator: char) -> String {
        let [read, written, deleted] = labels;
        match self.subcommand.kind() {
            TotalsKind::Write => self.stat_field(written, self.total_written()),
            TotalsKind::Read => self.stat_field(read, self.bytes_read()),
            TotalsKind::Delete => {
                let mut out = self.stat_field(read, self.bytes_read());
                out.push(separator);
                out.push_str(&self.stat_field(written, self.total_written()));
                out.push(separator);
                if let Some(label) = deleted.filter(|l| !l.is_empty()) {
                    out.push_str(&format!(
                        "{}: {}",
                        self.translate(label),
                        self.bytes_deleted()
                    ));
                }
                out
            }
        }
    }
}

/// Base-1024 size with an `iB` unit, rounded up
///
/// Values below ten units keep one decimal (`1.5KiB`), larger ones are whole
/// (`10KiB`). Plain byte counts have no decimal (`512B`).
#[must_use]
pub fn human_readable(bytes: u64) -> String {
    const PREFIXES: [char; 8] = ['K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

    if bytes < 1024 {
        return format!("{bytes}B");
    }

    let mut value = bytes as f64;
    let mut exponent = 0usize;
    while value >= 1024.0 && exponent < PREFIXES.len() {
        value /= 1024.0;
        exponent += 1;
    }

    if value < 10.0 {
        let tenths = (value * 10.0).ceil() / 10.0;
        if tenths < 10.0 {
            return format!("{tenths:.1}{}iB", PREFIXES[exponent - 1]);
        }
        value = tenths;
    }

    let mut whole = value.ceil();
    if whole >= 1024.0 && exponent < PREFIXES.len() {
        whole = 1.0;
        exponent += 1;
        return format!("{whole:.1}{}iB", PREFIXES[exponent - 1]);
    }
    format!("{whole:.0}{}iB", PREFIXES[exponent - 1])
}
