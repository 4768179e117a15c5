//! Record-level archive I/O
//!
//! A deliberately small archive engine: `create` concatenates its inputs and
//! writes them out in fixed-size records, `list` reads an archive back one
//! record at a time. Every record moved is one checkpoint operation.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use checkpoint_core::{Checkpoint, TransferStats};

/// Archive name meaning the standard streams
pub const STDIO_ARCHIVE: &str = "-";

/// Fill `buf` as far as the reader allows
///
/// Returns the number of bytes read; anything short of `buf.len()` means end
/// of input.
fn read_record(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn open_output(archive: &str) -> Result<Box<dyn Write>> {
    if archive == STDIO_ARCHIVE {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(archive).with_context(|| format!("Cannot create archive {archive}"))?;
    Ok(Box::new(file))
}

fn open_input(archive: &str) -> Result<Box<dyn Read>> {
    if archive == STDIO_ARCHIVE {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(archive).with_context(|| format!("Cannot open archive {archive}"))?;
    Ok(Box::new(file))
}

fn open_inputs(inputs: &[PathBuf]) -> Result<Box<dyn Read>> {
    let mut reader: Box<dyn Read> = Box::new(io::empty());
    for path in inputs {
        let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
        reader = Box::new(reader.chain(file));
    }
    Ok(reader)
}

/// Write `inputs` into `archive`, one checkpoint per record
///
/// The final record is padded with zeros to the full record size. Returns the
/// number of records written.
pub fn create(
    archive: &str,
    inputs: &[PathBuf],
    stats: &TransferStats,
    checkpoint: &mut Checkpoint,
) -> Result<u64> {
    let mut reader = open_inputs(inputs)?;
    let mut out = open_output(archive)?;
    let record_size = usize::try_from(stats.record_size()).context("Record size too large")?;
    let mut record = vec![0u8; record_size];
    let mut records = 0u64;

    loop {
        let n = read_record(&mut *reader, &mut record).context("Failed to read input")?;
        if n == 0 {
            break;
        }
        record[n..].fill(0);
        out.write_all(&record)
            .with_context(|| format!("Failed to write archive {archive}"))?;
        stats.add_bytes_written(stats.record_size());
        records += 1;
        checkpoint.note_operation(true);
        if n < record_size {
            break;
        }
    }
    out.flush()
        .with_context(|| format!("Failed to write archive {archive}"))?;

    info!(archive = archive, records = records, "Archive created");
    Ok(records)
}

/// Read `archive` back record by record, one checkpoint per record
///
/// Returns the number of records read, a trailing short record included.
pub fn list(archive: &str, stats: &TransferStats, checkpoint: &mut Checkpoint) -> Result<u64> {
    let mut input = open_input(archive)?;
    let record_size = usize::try_from(stats.record_size()).context("Record size too large")?;
    let mut record = vec![0u8; record_size];
    let mut records = 0u64;

    loop {
        let n = read_record(&mut *input, &mut record)
            .with_context(|| format!("Failed to read archive {archive}"))?;
        if n == 0 {
            break;
        }
        if n < record_size {
            debug!(archive = archive, bytes = n, "Short final record");
        }
        stats.add_record_read();
        records += 1;
        checkpoint.note_operation(false);
        if n < record_size {
            break;
        }
    }

    info!(archive = archive, records = records, "Archive read");
    Ok(records)
}

/// Whether `archive` names the standard streams
#[must_use]
pub fn is_stdio(archive: &str) -> bool {
    archive == STDIO_ARCHIVE
}
