//! Checkpoint Format Interpreter
//!
//! Expands display templates for `echo` and `ttyout` actions. A template is
//! literal text mixed with `%` directives; a directive is either a bare letter
//! (`%u`) or a brace argument followed by a letter (`%{%H:%M}t`).
//!
//! | Directive | Expansion |
//! |-----------|-----------|
//! | `%c` | the compound default status line ([`DEFAULT_FORMAT`]) |
//! | `%u` | checkpoint number |
//! | `%s` | operation word, `read` or `write` |
//! | `%d` | seconds since processing began |
//! | `%T` | running totals; `{a,b,c}` relabels or drops the read, written and deleted fields |
//! | `%t` | local time; `{FMT}` is a strftime format, default `%c` |
//! | `%*` | pad with spaces to the terminal width; `{N}` pads to column N |
//!
//! Any other letter is copied through together with its `%`. A literal
//! carriage return resets the column to zero and leaves a partial line that
//! must be erased before the program exits.

use std::borrow::Cow;
use std::fmt::Write as FmtWrite;
use std::io::{self, Read, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::FormatError;
use crate::sink::{terminal_width, Sink, DEFAULT_WIDTH};
use crate::stats::{ArchiveContext, CHECKPOINT_TOTAL_LABELS};
use crate::text::split_words;

/// Template expanded by `%c`
pub const DEFAULT_FORMAT: &str = "%{%Y-%m-%d %H:%M:%S}t: %ds, %{read,wrote}T%*\r";

/// Emitted by `%t` when the time cannot be formatted
pub const TIME_PLACEHOLDER: &str = "????-??-?? ??:??:??";

const WRITE_TEMPLATE: &str = "Write checkpoint %u";
const READ_TEMPLATE: &str = "Read checkpoint %u";

/// Renders templates for one checkpoint
pub struct Formatter<'a> {
    archive: &'a dyn ArchiveContext,
    is_write: bool,
    counter: u64,
    now: Option<DateTime<Local>>,
    carriage_return: bool,
    errors: Vec<FormatError>,
}

impl<'a> Formatter<'a> {
    /// Formatter for checkpoint number `counter` of a read or write operation
    #[must_use]
    pub fn new(archive: &'a dyn ArchiveContext, is_write: bool, counter: u64) -> Self {
        Self {
            archive,
            is_write,
            counter,
            now: None,
            carriage_return: false,
            errors: Vec::new(),
        }
    }

    /// Use a fixed time for `%t` instead of the clock
    #[must_use]
    pub fn at_time(mut self, now: DateTime<Local>) -> Self {
        self.now = Some(now);
        self
    }

    /// Whether any render emitted a literal carriage return
    #[must_use]
    pub fn emitted_carriage_return(&self) -> bool {
        self.carriage_return
    }

    /// Recoverable errors collected so far
    pub fn take_errors(&mut self) -> Vec<FormatError> {
        std::mem::take(&mut self.errors)
    }

    /// The template used when an action carries none
    #[must_use]
    pub fn default_template(&self) -> Cow<'static, str> {
        if self.is_write {
            self.archive.translate(WRITE_TEMPLATE)
        } else {
            self.archive.translate(READ_TEMPLATE)
        }
    }

    /// Expand `template` (or the default) into `out`, starting at `column`
    ///
    /// Returns the column the output ended at. The sink is flushed once the
    /// whole template has been written.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn render(
        &mut self,
        out: &mut dyn Sink,
        template: Option<&str>,
        column: usize,
    ) -> io::Result<usize> {
        let fallback;
        let template = match template {
            Some(t) => t,
            None => {
                fallback = self.default_template();
                &*fallback
            }
        };

        let column = self.expand(out, template, column)?;
        out.flush()?;
        Ok(column)
    }

    fn expand(&mut self, out: &mut dyn Sink, template: &str, column: usize) -> io::Result<usize> {
        let mut col = column;
        let mut i = 0;

        while let Some(c) = template[i..].chars().next() {
            i += c.len_utf8();

            if c != '%' {
                write!(out, "{c}")?;
                if c == '\r' {
                    col = 0;
                    self.carriage_return = true;
                } else {
                    col += c.width().unwrap_or(0);
                }
                continue;
            }

            let mut arg = None;
            if template[i..].starts_with('{') {
                if let Some(end) = template[i + 1..].find('}') {
                    arg = Some(&template[i + 1..i + 1 + end]);
                    i += end + 2;
                } else {
                    out.write_all(b"%{")?;
                    col += 2;
                    i += 1;
                    continue;
                }
            }

            let Some(directive) = template[i..].chars().next() else {
                out.write_all(b"%")?;
                col += 1;
                break;
            };
            i += directive.len_utf8();

            match directive {
                'c' => {
                    col = self.render(out, Some(DEFAULT_FORMAT), col)?;
                }
                'u' => {
                    col += emit(out, &self.counter.to_string())?;
                }
                's' => {
                    let word = if self.is_write { "write" } else { "read" };
                    col += emit(out, &self.archive.translate(word))?;
                }
                'd' => {
                    let secs = self.archive.elapsed().as_secs_f64();
                    col += emit(out, &format!("{secs:.0}"))?;
                }
                'T' => {
                    let labels = self.total_labels(arg);
                    let totals = self.archive.format_totals(
                        [labels[0].as_deref(), labels[1].as_deref(), labels[2].as_deref()],
                        ',',
                    );
                    col += emit(out, &totals)?;
                }
                't' => {
                    let stamp = self.timestamp(arg.unwrap_or("%c"));
                    col += emit(out, &stamp)?;
                }
                '*' => {
                    let width = match arg {
                        None => terminal_width(out),
                        Some(a) => a.parse::<usize>().unwrap_or(DEFAULT_WIDTH),
                    };
                    if width > col {
                        let pad = u64::try_from(width - col).unwrap_or(u64::MAX);
                        io::copy(&mut io::repeat(b' ').take(pad), out)?;
                        col = width;
                    }
                }
                other => {
                    write!(out, "%{other}")?;
                    col += 1 + other.width().unwrap_or(0);
                }
            }
        }

        Ok(col)
    }

    fn total_labels(&mut self, arg: Option<&str>) -> [Option<String>; 3] {
        let defaults = CHECKPOINT_TOTAL_LABELS.map(|l| Some(l.to_string()));
        let Some(arg) = arg else {
            return defaults;
        };

        match split_words(arg, ',') {
            Err(reason) => {
                self.errors.push(FormatError::Split {
                    arg: arg.to_string(),
                    reason,
                });
                defaults
            }
            Ok(words) if words.len() > 3 => {
                self.errors.push(FormatError::TooManyWords(arg.to_string()));
                defaults
            }
            Ok(words) => {
                let mut labels: [Option<String>; 3] = [None, None, None];
                for (slot, word) in labels.iter_mut().zip(words) {
                    *slot = Some(word);
                }
                labels
            }
        }
    }

    /// Format the time, copying conversions chrono does not know verbatim
    fn timestamp(&self, fmt: &str) -> String {
        let now = self.now.unwrap_or_else(Local::now);
        let mut text = String::new();
        let mut rest = fmt;

        while let Some(pos) = rest.find('%') {
            text.push_str(&rest[..pos]);
            rest = &rest[pos..];
            match conversion_len(rest) {
                Some(len) => {
                    let items = StrftimeItems::new(&rest[..len]);
                    if write!(text, "{}", now.format_with_items(items)).is_err() {
                        return TIME_PLACEHOLDER.to_string();
                    }
                    rest = &rest[len..];
                }
                None => {
                    text.push('%');
                    rest = &rest[1..];
                }
            }
        }
        text.push_str(rest);
        text
    }
}

/// Longest conversion chrono accepts, e.g. `%::z` or `%.3f`
const MAX_CONVERSION_CHARS: usize = 5;

/// Byte length of the shortest valid conversion at the start of `s`
fn conversion_len(s: &str) -> Option<usize> {
    s.char_indices()
        .skip(1)
        .take(MAX_CONVERSION_CHARS - 1)
        .map(|(i, c)| i + c.len_utf8())
        .find(|&end| StrftimeItems::new(&s[..end]).all(|item| !matches!(item, Item::Error)))
}

fn emit(out: &mut dyn Sink, text: &str) -> io::Result<usize> {
    out.write_all(text.as_bytes())?;
    Ok(text.width())
}
