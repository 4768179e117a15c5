//! Action execution
//!
//! Runs the compiled list in order each time the scheduler fires. A failing
//! action never aborts the archive run; the error is logged and the next
//! action runs.

use std::io::{self, Write};
use std::thread;

use tracing::{debug, trace, warn};

use super::Checkpoint;
use crate::action::Action;
use crate::error::FormatError;
use crate::exec::ScriptContext;
use crate::format::Formatter;
use crate::sink::Sink;
use crate::stats::ArchiveContext;

impl Checkpoint {
    pub(super) fn run_actions(&mut self, is_write: bool) {
        let Self {
            actions,
            counter,
            signals,
            tty,
            progress,
            diagnostics,
            archive,
            runner,
            ..
        } = self;
        let counter = *counter;
        let archive: &dyn ArchiveContext = &**archive;

        trace!(checkpoint = counter, is_write, "Running checkpoint actions");

        for action in actions.iter() {
            let result = match action {
                Action::Dot => write_flushed(&mut **progress, b"."),

                Action::Bell => match tty.get() {
                    Some(handle) => write_flushed(handle, b"\x07"),
                    None => Ok(()),
                },

                Action::Echo(template) => {
                    let mut fmt = Formatter::new(archive, is_write, counter);
                    let result = echo(&mut **diagnostics, archive, &mut fmt, template.as_deref());
                    report(&mut **diagnostics, archive, fmt.take_errors());
                    result
                }

                Action::Ttyout(template) => {
                    let mut fmt = Formatter::new(archive, is_write, counter);
                    let result = match tty.get() {
                        Some(handle) => fmt.render(handle, Some(template.as_str()), 0).map(|_| ()),
                        None => Ok(()),
                    };
                    if fmt.emitted_carriage_return() {
                        tty.mark_cleanup();
                    }
                    report(&mut **diagnostics, archive, fmt.take_errors());
                    result
                }

                Action::Sleep(duration) => {
                    thread::sleep(*duration);
                    Ok(())
                }

                Action::Exec(command) => {
                    let archive_name = archive.archive_name().unwrap_or_else(|| "-".to_string());
                    let context = ScriptContext {
                        archive_name: &archive_name,
                        checkpoint: counter,
                        blocking_factor: archive.blocking_factor(),
                    };
                    match runner.run(command, &context) {
                        Ok(status) if !status.success() => {
                            warn!(command = %command, status = %status, "Checkpoint command failed");
                            Ok(())
                        }
                        Ok(_) => Ok(()),
                        Err(e) => {
                            warn!(command = %command, error = %e, "Cannot run checkpoint command");
                            Ok(())
                        }
                    }
                }

                Action::Totals => write_flushed(&mut **diagnostics, archive.total_stats().as_bytes()),

                Action::Wait(_) => match signals.wait() {
                    Ok(signal) => {
                        debug!(signal = %signal, "Checkpoint wait released");
                        Ok(())
                    }
                    Err(errno) => Err(io::Error::from(errno)),
                },
            };

            if let Err(e) = result {
                debug!(action = action.keyword(), error = %e, "Checkpoint action failed");
            }
        }
    }
}

fn write_flushed(out: &mut dyn Sink, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes)?;
    out.flush()
}

/// `program: <message>` on its own line, the message starting after the prefix
fn echo(
    out: &mut dyn Sink,
    archive: &dyn ArchiveContext,
    fmt: &mut Formatter<'_>,
    template: Option<&str>,
) -> io::Result<()> {
    let prefix = format!("{}: ", archive.program_name());
    out.write_all(prefix.as_bytes())?;
    fmt.render(out, template, prefix.chars().count())?;
    write_flushed(out, b"\n")
}

fn report(out: &mut dyn Sink, archive: &dyn ArchiveContext, errors: Vec<FormatError>) {
    for error in errors {
        warn!(error = %error, "Bad checkpoint format argument");
        let line = format!("{}: {error}\n", archive.program_name());
        if let Err(e) = write_flushed(out, line.as_bytes()) {
            debug!(error = %e, "Cannot report checkpoint format error");
        }
    }
}
