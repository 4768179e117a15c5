//! Architectural Enforcement Integration Tests
//!
//! This package contains tests that enforce source-level rules on the
//! checkpoint core library:
//! - No `unwrap()` / `expect()` in production code; errors propagate
//! - No `println!` / `eprintln!`; output goes through the configured sinks
//!
//! These tests are designed to catch violations early in the development cycle.

use std::fs;
use std::path::{Path, PathBuf};

/// A forbidden pattern found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the match
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending pattern
    pub pattern: &'static str,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.pattern)
    }
}

/// Patterns forbidden in non-test code of the core crate
pub const FORBIDDEN: &[&str] = &[".unwrap()", ".expect(", "println!", "eprintln!"];

/// Scan one source text
///
/// Everything from the first `#[cfg(test)]` on is test code and skipped, as
/// is the comment part of each line.
#[must_use]
pub fn scan_source(path: &Path, content: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }
        let code_part = line.split("//").next().unwrap_or(line);
        for &pattern in FORBIDDEN {
            if code_part.contains(pattern) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    pattern,
                });
            }
        }
    }
    violations
}

/// Scan every `.rs` file under `dir`
#[must_use]
pub fn scan_directory(dir: &Path) -> Vec<Violation> {
    let mut violations = Vec::new();
    if !dir.exists() {
        return violations;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(entry.path()) else {
            continue;
        };
        violations.extend(scan_source(entry.path(), &content));
    }
    violations
}

/// The workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .to_path_buf()
}
